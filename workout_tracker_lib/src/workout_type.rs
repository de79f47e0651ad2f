use serde::{Deserialize, Serialize};

/// The kinds of activity a session can track.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkoutType {
    #[default]
    Running,
    Walking,
    Cycling,
}

impl WorkoutType {
    /// Every workout type in its fixed display order.
    pub const ALL: [WorkoutType; 3] = [
        WorkoutType::Running,
        WorkoutType::Walking,
        WorkoutType::Cycling,
    ];

    /// Stable integer id used in the session database.
    pub fn id(self) -> i64 {
        match self {
            WorkoutType::Running => 0,
            WorkoutType::Walking => 1,
            WorkoutType::Cycling => 2,
        }
    }

    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            0 => Some(WorkoutType::Running),
            1 => Some(WorkoutType::Walking),
            2 => Some(WorkoutType::Cycling),
            _ => None,
        }
    }
}

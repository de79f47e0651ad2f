pub(crate) mod constants;
mod db;

pub use db::SessionDatabase;

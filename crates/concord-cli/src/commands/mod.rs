pub mod delete;
pub mod detect;
pub mod dispatch;
pub mod health;
pub mod migrate;
pub mod reconcile;
pub mod schema;
pub mod sync;
pub mod tx;

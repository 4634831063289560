pub mod coalesce;
pub mod engine;
pub mod entry;
pub mod live;
pub mod normalize;

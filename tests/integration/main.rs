//! Integration tests for the collection engine

mod flatten_properties;
mod sync_engine;
mod test_script;

pub mod device_enumerator;
pub mod engine;
pub mod probe;
pub mod rodio_engine;

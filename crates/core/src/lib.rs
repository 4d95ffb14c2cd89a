pub mod cache;
pub mod config;
pub mod converter;
pub mod metrics;
pub mod orchestrator;
pub mod processor;
pub mod testing;

pub use cache::{hash_file, CacheConfig, CacheError, CacheKey, CacheStats, ConversionCache};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, LogFormat,
    SanitizedConfig,
};
pub use converter::{
    ConversionJob, ConversionKind, Converter, ConverterConfig, ConverterError, ErrorKind,
    ExternalToolConverter, Format, ToolAvailability, ToolKind, ToolRoute,
};
pub use orchestrator::{ConversionFailure, ConversionOrchestrator, ConversionResult, OrchestratorError};
pub use processor::{
    ConversionTask, ProcessorConfig, QueueStats, TaskEvent, TaskId, TaskQueue, TaskStatus,
};

mod parsing;
mod secret;
mod settings;
mod types;

pub(crate) use types::{
    AiSettings, ApiSettings, AuthSettings, ConfigError, CorsSettings, DatabaseSettings,
    Environment, MessagingSettings, QuizSettings, RedisSettings, RuntimeSettings, Settings,
    TelemetrySettings,
};

use super::parsing::{
    env_optional, env_or_default, normalize_prefix, parse_bool, parse_cors_origins,
    parse_environment, parse_positive_i64, parse_u16, parse_u32, parse_u64,
};
use super::secret::load_or_create_dev_secret;
use super::types::{
    AiSettings, ApiSettings, AuthSettings, ConfigError, CorsSettings, DatabaseSettings,
    MessagingSettings, QuizSettings, RedisSettings, RuntimeSettings, ServerHost, ServerPort,
    ServerSettings, Settings, TelemetrySettings,
};

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("SCHOOLHUB_HOST", "0.0.0.0");
        let port = env_or_default("SCHOOLHUB_PORT", "8000");

        let environment = parse_environment(
            env_optional("SCHOOLHUB_ENV").or_else(|| env_optional("ENVIRONMENT")),
        );
        let strict_config = env_optional("SCHOOLHUB_STRICT_CONFIG")
            .map(|value| parse_bool(&value))
            .unwrap_or(false)
            || environment.is_production();

        let project_name = env_or_default("PROJECT_NAME", "SchoolHub Grading API");
        let version = env_or_default("VERSION", env!("CARGO_PKG_VERSION"));
        let prefix = normalize_prefix(&env_or_default("API_PREFIX", "/api"));

        let jwt_secret = match env_optional("AUTH_JWT_SECRET") {
            Some(value) => value,
            None if strict_config => return Err(ConfigError::MissingSecret("AUTH_JWT_SECRET")),
            None => load_or_create_dev_secret(),
        };
        let algorithm = env_or_default("AUTH_JWT_ALGORITHM", "HS256");

        let cors_origins = parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?;

        let postgres_server = env_or_default("POSTGRES_SERVER", "localhost");
        let postgres_port = parse_u16("POSTGRES_PORT", env_or_default("POSTGRES_PORT", "5432"))?;
        let postgres_user = env_or_default("POSTGRES_USER", "schoolhub");
        let postgres_password = env_or_default("POSTGRES_PASSWORD", "");
        let postgres_db = env_or_default("POSTGRES_DB", "schoolhub");
        let database_url = env_optional("DATABASE_URL");
        let schema = env_or_default("DATABASE_SCHEMA", "public");
        let max_connections =
            parse_u32("DATABASE_MAX_CONNECTIONS", env_or_default("DATABASE_MAX_CONNECTIONS", "20"))?;

        let redis_host = env_or_default("REDIS_HOST", "localhost");
        let redis_port = parse_u16("REDIS_PORT", env_or_default("REDIS_PORT", "6379"))?;
        let redis_db = parse_u16("REDIS_DB", env_or_default("REDIS_DB", "0"))?;
        let redis_password = env_or_default("REDIS_PASSWORD", "");

        let openai_api_key = env_or_default("OPENAI_API_KEY", "");
        let openai_base_url = env_or_default("OPENAI_BASE_URL", "");
        let ai_model = env_or_default("AI_MODEL", "gpt-4o-mini");
        let ai_max_tokens = parse_u32("AI_MAX_TOKENS", env_or_default("AI_MAX_TOKENS", "1500"))?;
        let ai_request_timeout =
            parse_u64("AI_REQUEST_TIMEOUT", env_or_default("AI_REQUEST_TIMEOUT", "60"))?;

        let save_answer_rate_limit =
            parse_u64("SAVE_ANSWER_RATE_LIMIT", env_or_default("SAVE_ANSWER_RATE_LIMIT", "30"))?;
        let save_answer_rate_window_seconds = parse_u64(
            "SAVE_ANSWER_RATE_WINDOW_SECONDS",
            env_or_default("SAVE_ANSWER_RATE_WINDOW_SECONDS", "10"),
        )?;
        let submit_grace_seconds = parse_u64(
            "QUIZ_SUBMIT_GRACE_SECONDS",
            env_or_default("QUIZ_SUBMIT_GRACE_SECONDS", "60"),
        )? as i64;

        let student_quota_limit = parse_positive_i64(
            "MESSAGE_QUOTA_LIMIT",
            env_or_default("MESSAGE_QUOTA_LIMIT", "10"),
        )?;
        let student_quota_window_hours = parse_positive_i64(
            "MESSAGE_QUOTA_WINDOW_HOURS",
            env_or_default("MESSAGE_QUOTA_WINDOW_HOURS", "168"),
        )?;
        let max_body_chars = parse_u64(
            "MESSAGE_MAX_BODY_CHARS",
            env_or_default("MESSAGE_MAX_BODY_CHARS", "4000"),
        )? as usize;

        let log_level = env_or_default("SCHOOLHUB_LOG_LEVEL", "info");
        let json = env_optional("SCHOOLHUB_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_enabled =
            env_optional("PROMETHEUS_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);

        let settings = Self {
            server: ServerSettings {
                host: ServerHost::parse(host)?,
                port: ServerPort::parse(port)?,
            },
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { project_name, version, prefix },
            auth: AuthSettings { jwt_secret, algorithm },
            cors: CorsSettings { origins: cors_origins },
            database: DatabaseSettings {
                postgres_server,
                postgres_port,
                postgres_user,
                postgres_password,
                postgres_db,
                database_url,
                schema,
                max_connections,
            },
            redis: RedisSettings {
                host: redis_host,
                port: redis_port,
                db: redis_db,
                password: redis_password,
            },
            ai: AiSettings {
                openai_api_key,
                openai_base_url,
                ai_model,
                ai_max_tokens,
                ai_request_timeout,
            },
            quiz: QuizSettings {
                save_answer_rate_limit,
                save_answer_rate_window_seconds,
                submit_grace_seconds,
            },
            messaging: MessagingSettings {
                student_quota_limit,
                student_quota_window_hours,
                max_body_chars,
            },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;

        Ok(settings)
    }

    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host.0, self.server.port.0)
    }

    pub(crate) fn server_host(&self) -> &str {
        &self.server.host.0
    }

    pub(crate) fn server_port(&self) -> u16 {
        self.server.port.0
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn auth(&self) -> &AuthSettings {
        &self.auth
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    pub(crate) fn redis(&self) -> &RedisSettings {
        &self.redis
    }

    pub(crate) fn ai(&self) -> &AiSettings {
        &self.ai
    }

    pub(crate) fn quiz(&self) -> &QuizSettings {
        &self.quiz
    }

    pub(crate) fn messaging(&self) -> &MessagingSettings {
        &self.messaging
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.schema.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "DATABASE_SCHEMA",
                value: String::from("<empty>"),
            });
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                field: "DATABASE_MAX_CONNECTIONS",
                value: String::from("0"),
            });
        }

        if self.quiz.save_answer_rate_window_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "SAVE_ANSWER_RATE_WINDOW_SECONDS",
                value: String::from("0"),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.database.database_url.is_none() && self.database.postgres_password.is_empty() {
            return Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"));
        }

        if self.auth.jwt_secret.len() < 32 {
            return Err(ConfigError::InvalidValue {
                field: "AUTH_JWT_SECRET",
                value: String::from("<shorter than 32 characters>"),
            });
        }

        Ok(())
    }
}

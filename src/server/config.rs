/// RTMP server configuration
use crate::{
    log::Logger,
    rtmp::{RTMP_DEFAULT_CHUNK_SIZE, RTMP_MAX_CHUNK_SIZE, RTMP_MIN_CHUNK_SIZE},
    utils::{get_env_bool, get_env_string, get_env_u32},
};

const RTMP_PORT_DEFAULT: u32 = 1935;

const MAX_PORT: u32 = 65535;

const QUEUE_CAPACITY_DEFAULT: u32 = 1024;

/// RTMP server configuration
#[derive(Clone)]
pub struct RtmpServerConfiguration {
    /// Port
    pub port: u32,

    /// Bind address
    pub bind_address: String,

    /// Initial chunk size offered to peers before a stage raises it
    pub chunk_size: usize,

    /// Capacity of the bounded ingress/egress message queues per connection
    pub queue_capacity: usize,

    /// True to log accepted/rejected connection attempts
    pub log_requests: bool,
}

impl RtmpServerConfiguration {
    /// Loads configuration for environment variables
    ///
    /// # Arguments
    ///
    /// * `logger` - The logger
    pub fn load_from_env(logger: &Logger) -> Result<RtmpServerConfiguration, ()> {
        let port = get_env_u32("RTMP_PORT", RTMP_PORT_DEFAULT);

        if port == 0 || port > MAX_PORT {
            logger.log_error(&format!("RTMP_PORT has an invalid value: {}", port));
            return Err(());
        }

        let bind_address = get_env_string("BIND_ADDRESS", "0.0.0.0");

        let chunk_size = get_env_u32("RTMP_CHUNK_SIZE", RTMP_DEFAULT_CHUNK_SIZE as u32) as usize;

        if !(RTMP_MIN_CHUNK_SIZE..=RTMP_MAX_CHUNK_SIZE).contains(&chunk_size) {
            logger.log_error(&format!(
                "RTMP_CHUNK_SIZE has an invalid value: {}. Min: {}. Max: {}",
                chunk_size, RTMP_MIN_CHUNK_SIZE, RTMP_MAX_CHUNK_SIZE
            ));
            return Err(());
        }

        let queue_capacity = get_env_u32("QUEUE_CAPACITY", QUEUE_CAPACITY_DEFAULT) as usize;

        let log_requests = get_env_bool("LOG_REQUESTS", true);

        Ok(RtmpServerConfiguration {
            port,
            bind_address,
            chunk_size,
            queue_capacity,
            log_requests,
        })
    }

    /// Gets the TCP address to listen on
    pub fn get_tcp_listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

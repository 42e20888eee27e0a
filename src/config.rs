use std::net::SocketAddr;

use clap::Parser;

use crate::S3Config;

/// Media server configuration, from flags or the environment.
#[derive(Debug, Clone, Parser)]
#[command(name = "media-server", version, about = "Serve local and S3 media with HTTP range support")]
pub struct ServerConfig {
    /// Address to listen on
    #[arg(long, env = "MEDIA_BIND", default_value = "127.0.0.1:5151")]
    pub bind: SocketAddr,

    /// Path the media endpoint is mounted on
    #[arg(long, env = "MEDIA_ROUTE", default_value = "/media")]
    pub route: String,

    /// S3 compatible endpoint URL, e.g. http://minio.local:9000
    #[arg(long, env = "MEDIA_S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    /// S3 region, otherwise taken from the AWS default chain
    #[arg(long, env = "MEDIA_S3_REGION")]
    pub s3_region: Option<String>,

    /// Use path-style bucket addressing
    #[arg(long, env = "MEDIA_S3_FORCE_PATH_STYLE")]
    pub s3_force_path_style: bool,
}

impl ServerConfig {
    pub fn s3(&self) -> S3Config {
        S3Config {
            endpoint: self.s3_endpoint.clone(),
            region: self.s3_region.clone(),
            force_path_style: self.s3_force_path_style,
        }
    }
}

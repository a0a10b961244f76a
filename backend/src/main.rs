mod config;
mod inference;
mod routes;
mod stages;
mod storage;
#[cfg(test)]
mod testing;

use actix_web::{web, App, HttpServer};
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client as S3Client;
use aws_sdk_sagemakerruntime::Client as SageMakerClient;
use config::PipelineConfig;
use inference::SageMakerEndpoint;
use routes::{configure_routes, json_config};
use stages::StageRegistry;
use std::sync::Arc;
use storage::S3ObjectStore;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = PipelineConfig::load().map_err(|e| {
        log::error!("Invalid pipeline configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e)
    })?;
    log::info!(
        "Endpoint '{}', content type '{}', threshold {}",
        config.endpoint_name,
        config.content_type,
        config.threshold
    );
    log::info!("Scratch directory: {}", config.scratch_dir.display());

    // Credentials and region come from the platform environment
    let aws_config = aws_config::defaults(BehaviorVersion::latest()).load().await;

    let s3_client = S3Client::new(&aws_config);
    let sagemaker_client = SageMakerClient::new(&aws_config);

    let store = Arc::new(S3ObjectStore::new(s3_client, config.scratch_dir.clone()));
    let endpoint = Arc::new(SageMakerEndpoint::new(
        sagemaker_client,
        config.endpoint_name.clone(),
    ));
    let registry = StageRegistry::standard(store, endpoint, &config).map_err(|e| {
        log::error!("Failed to register stages: {}", e);
        std::io::Error::other(e)
    })?;

    let bind_address = config.listen_address();
    let max_event_bytes = config.max_event_bytes;

    log::info!("Starting stage server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(registry.clone()))
            .app_data(json_config(max_event_bytes))
            .configure(configure_routes)
    })
    .bind(&bind_address)?
    .run()
    .await
}

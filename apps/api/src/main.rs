mod chain;
mod collaborators;
mod config;
mod db;
mod errors;
mod extraction;
mod inference;
mod intake;
mod models;
mod pipeline;
mod recovery;
mod render;
mod routes;
mod state;
mod status;
mod storage;

use anyhow::Result;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::collaborators::{
    HttpJobPostingExtractor, HttpSkillsNormalizer, JobPostingExtractor, SkillsNormalizer,
    TemplatePromptAssembler,
};
use crate::config::Config;
use crate::db::{create_pool, ensure_schema};
use crate::extraction::ExtractionChain;
use crate::inference::catalog::{self, ANTHROPIC_API_MODEL, OPTIMIZATION_MODELS, SCORING_MODELS};
use crate::inference::transport::{AnthropicApiTransport, BedrockTransport};
use crate::inference::{ModelChain, ModelTransport};
use crate::models::job::OutputFormat;
use crate::pipeline::{Orchestrator, PipelineDeps};
use crate::render::RendererMultiplexer;
use crate::routes::build_router;
use crate::state::AppState;
use crate::status::postgres::PgStatusStore;
use crate::storage::s3::S3ArtifactStore;

/// Request timeout for the job-posting and skills services.
const COLLABORATOR_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Tailor API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;
    ensure_schema(&db).await?;
    let status = Arc::new(PgStatusStore::new(db));

    // Initialize AWS clients
    let aws = load_aws_config(&config).await;
    let artifacts = Arc::new(S3ArtifactStore::new(build_s3_client(&config, &aws), &config.s3_bucket));
    info!(bucket = %config.s3_bucket, "S3 client initialized");

    let textract = config
        .enable_textract
        .then(|| aws_sdk_textract::Client::new(&aws));
    let extraction = ExtractionChain::standard(textract, config.extraction_timeout);
    info!(strategies = ?extraction.strategy_ids(), "Extraction chain ready");

    let bedrock: Arc<dyn ModelTransport> =
        Arc::new(BedrockTransport::new(aws_sdk_bedrockruntime::Client::new(&aws)));
    let mut backends: Vec<_> = catalog::select(OPTIMIZATION_MODELS, config.model_chain.as_deref())
        .into_iter()
        .map(|entry| entry.into_backend(bedrock.clone(), config.model_timeout))
        .collect();
    if let Some(key) = &config.anthropic_api_key {
        let direct: Arc<dyn ModelTransport> =
            Arc::new(AnthropicApiTransport::new(key.clone(), config.model_timeout)?);
        backends.push(ANTHROPIC_API_MODEL.into_backend(direct, config.model_timeout));
    }
    let models = ModelChain::new(backends);
    info!(backends = ?models.backend_ids(), "Model chain ready");

    let scoring = ModelChain::new(
        SCORING_MODELS
            .iter()
            .cloned()
            .map(|entry| entry.into_backend(bedrock.clone(), config.model_timeout))
            .collect(),
    );

    let renderers = RendererMultiplexer::standard(config.render_timeout);
    for format in [OutputFormat::Pdf, OutputFormat::Word, OutputFormat::Text] {
        info!(format = %format, renderers = ?renderers.renderer_ids(format), "Renderer chain ready");
    }

    let job_postings: Option<Arc<dyn JobPostingExtractor>> = match &config.job_extractor_url {
        Some(url) => Some(Arc::new(HttpJobPostingExtractor::new(url.as_str(), COLLABORATOR_TIMEOUT)?)),
        None => {
            warn!("JOB_EXTRACTOR_URL not set; job URLs will not be scraped");
            None
        }
    };
    let skills: Option<Arc<dyn SkillsNormalizer>> = match &config.skills_service_url {
        Some(url) => Some(Arc::new(HttpSkillsNormalizer::new(url.as_str(), COLLABORATOR_TIMEOUT)?)),
        None => {
            warn!("SKILLS_SERVICE_URL not set; skills normalization disabled");
            None
        }
    };

    let orchestrator = Orchestrator::new(PipelineDeps {
        status: status.clone(),
        artifacts: artifacts.clone(),
        extraction,
        models,
        scoring,
        renderers,
        prompts: Arc::new(TemplatePromptAssembler),
        job_postings,
        skills,
        artifact_url_ttl: config.artifact_url_ttl,
    });

    let state = AppState {
        status,
        artifacts,
        orchestrator: Arc::new(orchestrator),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Shared AWS configuration. Static credentials are used when both keys are set,
/// otherwise the default provider chain applies.
async fn load_aws_config(config: &Config) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.aws_region.clone()));

    if let (Some(key_id), Some(secret)) = (&config.aws_access_key_id, &config.aws_secret_access_key) {
        loader = loader.credentials_provider(Credentials::new(
            key_id,
            secret,
            None,
            None,
            "tailor-static",
        ));
    }

    loader.load().await
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
fn build_s3_client(config: &Config, aws: &SdkConfig) -> aws_sdk_s3::Client {
    let mut builder = aws_sdk_s3::config::Builder::from(aws);
    if let Some(endpoint) = &config.s3_endpoint {
        builder = builder.endpoint_url(endpoint).force_path_style(true);
    }
    aws_sdk_s3::Client::from_conf(builder.build())
}

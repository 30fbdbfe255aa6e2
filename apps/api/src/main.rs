mod classify;
mod config;
mod errors;
mod extract;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{ensure, Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::classify::{Artefact, LabelSet, OnnxClassifierConfig, OnnxRoleClassifier};
use crate::config::Config;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let target = env!("CARGO_PKG_NAME").replace('-', "_");
            EnvFilter::new(format!("{}={}", target, &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting resumescan API v{}", env!("CARGO_PKG_VERSION"));

    // Load the label set
    let labels = Arc::new(load_labels(&config)?);
    info!("Label set loaded ({} roles)", labels.len());

    // Load the pretrained tokenizer and model
    let classifier = OnnxRoleClassifier::new(OnnxClassifierConfig {
        model: Artefact {
            path: config.model_path.clone(),
            sha256: config.model_sha256.clone(),
        },
        tokenizer: Artefact {
            path: config.tokenizer_path.clone(),
            sha256: config.tokenizer_sha256.clone(),
        },
        input_name: config.input_name.clone(),
        output_name: config.output_name.clone(),
        max_sequence_length: config.max_sequence_length,
        pad_token: config.pad_token.clone(),
        pad_id: config.pad_id,
        unk_token: config.unk_token.clone(),
    })
    .context("Failed to initialize the role classifier")?;
    info!("Classifier initialized (model: {})", config.model_path.display());

    // The model must agree with the label set; refuse to serve otherwise
    let output_dim = classifier
        .output_dimension()
        .context("Failed to probe model output dimension")?;
    ensure!(
        output_dim == labels.len(),
        "Model outputs {output_dim} classes but the label set has {} entries",
        labels.len()
    );
    info!("Model output dimension verified ({output_dim} classes)");

    std::fs::create_dir_all(&config.upload_dir).with_context(|| {
        format!(
            "Failed to create upload directory {}",
            config.upload_dir.display()
        )
    })?;

    // Build app state
    let state = AppState {
        classifier: Arc::new(classifier),
        labels,
        config: config.clone(),
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

fn load_labels(config: &Config) -> Result<LabelSet> {
    match &config.labels_csv {
        Some(path) => LabelSet::from_csv_column(path, &config.labels_column)
            .with_context(|| format!("Failed to load label set from {}", path.display())),
        None => Ok(LabelSet::default_roles()),
    }
}

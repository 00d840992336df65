use axum::extract::FromRef;

use crate::analysis::AnalysisPipeline;
use crate::audio::UploadPolicy;
use crate::fusion::FusionMatrix;
use crate::store::AnalysisStore;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedAnalysisPipeline = Arc<AnalysisPipeline>;
pub type GuardedFusionMatrix = Arc<FusionMatrix>;
pub type GuardedAnalysisStore = Arc<dyn AnalysisStore>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub hash: String,
    pub pipeline: GuardedAnalysisPipeline,
    pub matrix: GuardedFusionMatrix,
    pub analysis_store: GuardedAnalysisStore,
    pub upload_policy: UploadPolicy,
}

impl ServerState {
    pub fn new(
        config: ServerConfig,
        pipeline: AnalysisPipeline,
        analysis_store: GuardedAnalysisStore,
        upload_policy: UploadPolicy,
    ) -> Self {
        Self {
            config,
            start_time: Instant::now(),
            hash: env!("GIT_HASH").to_string(),
            matrix: pipeline.matrix().clone(),
            pipeline: Arc::new(pipeline),
            analysis_store,
            upload_policy,
        }
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}

impl FromRef<ServerState> for GuardedAnalysisPipeline {
    fn from_ref(input: &ServerState) -> Self {
        input.pipeline.clone()
    }
}

impl FromRef<ServerState> for GuardedFusionMatrix {
    fn from_ref(input: &ServerState) -> Self {
        input.matrix.clone()
    }
}

impl FromRef<ServerState> for GuardedAnalysisStore {
    fn from_ref(input: &ServerState) -> Self {
        input.analysis_store.clone()
    }
}

impl FromRef<ServerState> for UploadPolicy {
    fn from_ref(input: &ServerState) -> Self {
        input.upload_policy.clone()
    }
}

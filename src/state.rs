use std::sync::Arc;
use std::{env, fs};

use anyhow::Context;
use progres_auth::TokenBlacklist;
use progres_config::{
    CookieConfig, CorsConfig, GroqConfig, JwtConfig, RateLimitConfig, UpstreamConfig,
};
use progres_models::recommendations::AcademicStructure;

use crate::upstream::{GroqClient, ProgresClient};

const DEFAULT_ACADEMIC_STRUCTURE: &str = include_str!("../data/academic-structure.json");

#[derive(Clone, Debug)]
pub struct AppState {
    pub jwt_config: JwtConfig,
    pub cookie_config: CookieConfig,
    pub cors_config: CorsConfig,
    pub rate_limit_config: RateLimitConfig,
    pub upstream_config: UpstreamConfig,
    pub blacklist: TokenBlacklist,
    pub progres: ProgresClient,
    pub groq: GroqClient,
    pub academic_structure: Arc<AcademicStructure>,
}

/// Reads the university catalog from `ACADEMIC_STRUCTURE_PATH`, falling back
/// to the catalog bundled with the binary.
pub fn load_academic_structure() -> anyhow::Result<AcademicStructure> {
    match env::var("ACADEMIC_STRUCTURE_PATH") {
        Ok(path) => {
            let json = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read academic structure from {}", path))?;
            AcademicStructure::from_json(&json)
                .with_context(|| format!("Invalid academic structure in {}", path))
        }
        Err(_) => AcademicStructure::from_json(DEFAULT_ACADEMIC_STRUCTURE)
            .context("Invalid bundled academic structure"),
    }
}

pub fn init_app_state() -> anyhow::Result<AppState> {
    let upstream_config = UpstreamConfig::from_env();
    let groq_config = GroqConfig::from_env();

    Ok(AppState {
        jwt_config: JwtConfig::from_env(),
        cookie_config: CookieConfig::from_env(),
        cors_config: CorsConfig::from_env(),
        rate_limit_config: RateLimitConfig::from_env(),
        blacklist: TokenBlacklist::new(),
        progres: ProgresClient::new(&upstream_config).map_err(|e| anyhow::anyhow!(e.message()))?,
        groq: GroqClient::new(&groq_config).map_err(|e| anyhow::anyhow!(e.message()))?,
        upstream_config,
        academic_structure: Arc::new(load_academic_structure()?),
    })
}

use progres_auth::{create_access_token, create_refresh_token, token_expiry_ms, verify_refresh_token};
use progres_core::AppError;
use progres_models::{LoginRequest, LoginResponse};
use tracing::{info, instrument, warn};

use crate::metrics::{
    track_login_failure, track_login_success, track_token_refresh, track_tokens_revoked,
};
use crate::state::AppState;

/// A token pair ready to be sent: the access token in the body, the refresh
/// token in the cookie.
#[derive(Debug)]
pub struct IssuedTokens {
    pub response: LoginResponse,
    pub refresh_token: String,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn issue(
    state: &AppState,
    uuid: String,
    external_token: &str,
    message: &str,
) -> Result<IssuedTokens, AppError> {
    let token = create_access_token(&uuid, external_token, &state.jwt_config)?;
    let refresh_token = create_refresh_token(&uuid, external_token, &state.jwt_config)?;

    Ok(IssuedTokens {
        response: LoginResponse {
            token,
            uuid,
            message: message.to_string(),
        },
        refresh_token,
    })
}

pub struct AuthService;

impl AuthService {
    #[instrument(skip(state, dto), fields(username = %dto.username))]
    pub async fn login(state: &AppState, dto: LoginRequest) -> Result<IssuedTokens, AppError> {
        let upstream = match state.progres.authenticate(&dto).await {
            Ok(upstream) => upstream,
            Err(e) => {
                track_login_failure(e.status.as_str());
                return Err(e);
            }
        };

        let (Some(external_token), Some(uuid)) =
            (non_blank(upstream.token), non_blank(upstream.uuid))
        else {
            warn!("Upstream authentication answered without token or uuid");
            track_login_failure("invalid_upstream_response");
            return Err(AppError::unauthorized(
                "Authentication failed: Invalid response from server".to_string(),
            ));
        };

        let issued = issue(state, uuid, &external_token, "Authentication successful")?;

        track_login_success();
        info!(uuid = %issued.response.uuid, "Student authenticated");
        Ok(issued)
    }

    /// Trades a refresh token for a new pair and revokes the old one.
    #[instrument(skip_all)]
    pub fn refresh(state: &AppState, refresh_token: &str) -> Result<IssuedTokens, AppError> {
        if state.blacklist.is_blacklisted(refresh_token) {
            warn!("Attempt to reuse a revoked refresh token");
            track_token_refresh(false);
            return Err(AppError::unauthorized(
                "Refresh token has been revoked".to_string(),
            ));
        }

        let claims = verify_refresh_token(refresh_token, &state.jwt_config).inspect_err(|_| {
            track_token_refresh(false);
        })?;

        if !state
            .blacklist
            .blacklist_if_absent(refresh_token, claims.expires_at_ms())
        {
            warn!("Refresh token consumed by a concurrent refresh");
            track_token_refresh(false);
            return Err(AppError::unauthorized(
                "Refresh token has been revoked".to_string(),
            ));
        }

        let issued = issue(
            state,
            claims.sub.clone(),
            &claims.external_token,
            "Token refreshed successfully",
        )?;

        track_token_refresh(true);
        info!(uuid = %claims.sub, "Tokens rotated");
        Ok(issued)
    }

    /// Revokes whichever of the two tokens are present and correctly signed.
    /// Returns how many were revoked.
    #[instrument(skip_all)]
    pub fn logout(
        state: &AppState,
        access_token: Option<&str>,
        refresh_token: Option<&str>,
    ) -> usize {
        let revoked = [access_token, refresh_token]
            .into_iter()
            .flatten()
            .filter(|token| !token.trim().is_empty())
            .filter_map(|token| {
                let expires_at = token_expiry_ms(token, &state.jwt_config).ok()?;
                state.blacklist.blacklist(token, expires_at);
                Some(())
            })
            .count();

        track_tokens_revoked(revoked);
        info!(revoked, "Logged out");
        revoked
    }
}

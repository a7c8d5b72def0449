//! HTTP handler functions for the impact map API.

use actix_web::{HttpResponse, web};
use impact_map_analytics::INTERNAL_ERROR_MESSAGE;
use impact_map_server_models::{ApiHealth, ApiImpactRequest, ApiImpactResponse, ApiMapDefaults};

use crate::{AppState, DEFAULT_LATITUDE, DEFAULT_LONGITUDE, DEFAULT_ZOOM};

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/map-defaults`
///
/// Returns the initial viewport for the front end.
pub async fn map_defaults() -> HttpResponse {
    HttpResponse::Ok().json(ApiMapDefaults {
        latitude: DEFAULT_LATITUDE,
        longitude: DEFAULT_LONGITUDE,
        zoom: DEFAULT_ZOOM,
    })
}

/// `GET /api/works`
///
/// Lists the names of every work that can be analyzed.
pub async fn works(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.analyzer.work_names())
}

/// `POST /api/impact`
///
/// Runs an impact analysis for the named work. A work that cannot be
/// found is a normal answer; data and configuration defects return 500
/// with a generic message and are logged in detail.
pub async fn impact(
    state: web::Data<AppState>,
    body: web::Json<ApiImpactRequest>,
) -> HttpResponse {
    let query = body.into_inner().work;
    let analyzer = state.analyzer.clone();

    let outcome = {
        let query = query.clone();
        web::block(move || analyzer.run_impact_analysis(&query)).await
    };

    match outcome {
        Ok(Ok(result)) => {
            HttpResponse::Ok().json(ApiImpactResponse::update_map(result.summary, result.map))
        }
        Ok(Err(e)) if e.is_user_facing() => {
            log::info!("Impact query '{query}' not answered: {e}");
            HttpResponse::Ok().json(ApiImpactResponse::text(e.user_message()))
        }
        Ok(Err(e)) => {
            log::error!("Impact analysis for '{query}' failed ({}): {e}", e.kind());
            HttpResponse::InternalServerError().json(ApiImpactResponse::text(e.user_message()))
        }
        Err(e) => {
            log::error!("Impact analysis for '{query}' could not run: {e}");
            HttpResponse::InternalServerError()
                .json(ApiImpactResponse::text(INTERNAL_ERROR_MESSAGE.to_string()))
        }
    }
}

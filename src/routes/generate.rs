use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use std::time::Instant;

use super::parse_json;
use crate::app_state::AppState;
use crate::error::AppResult;
use crate::models::tryon::{GenerateRequest, GenerateResponse};
use crate::services::prompt;

/// POST /functions/v1/tryon-generate — composite garments onto a user photo.
///
/// Stateless: the provider is called synchronously and its output URL is
/// returned as-is. Nothing is persisted here.
pub async fn generate_tryon(
    State(state): State<AppState>,
    body: Bytes,
) -> AppResult<Json<GenerateResponse>> {
    let request: GenerateRequest = parse_json(&body)?;
    let input = request.into_input()?;

    let instruction = prompt::build_instruction(&input);
    let images = prompt::image_inputs(&input);
    let garment_count = input.garment_urls.len();
    let model = state.provider.model().to_string();

    tracing::info!(
        model = %model,
        garment_count,
        custom_prompt = input.prompt.is_some(),
        "Submitting try-on generation"
    );

    let start = Instant::now();
    let outcome = state.provider.generate(&instruction, &images).await;
    metrics::histogram!("tryon_provider_seconds").record(start.elapsed().as_secs_f64());

    let result_image_url = match outcome {
        Ok(url) => url,
        Err(e) => {
            metrics::counter!("tryon_generations_total", "outcome" => "error").increment(1);
            tracing::warn!(model = %model, error = %e, "Try-on generation failed");
            return Err(e.into());
        }
    };

    metrics::counter!("tryon_generations_total", "outcome" => "ok").increment(1);
    tracing::info!(
        model = %model,
        garment_count,
        duration_ms = start.elapsed().as_millis() as u64,
        "Try-on generation complete"
    );

    Ok(Json(GenerateResponse {
        success: true,
        result_image_url,
        model,
        garment_count,
    }))
}

use super::{handlers, types};
use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Swagger UI at `/docs`, backed by the document at `/openapi.json`.
pub fn openapi_routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    #[derive(OpenApi)]
    #[openapi(
        info(title = "Grammar Correction API"),
        paths(handlers::correct),
        components(schemas(
            types::CorrectionRequest,
            types::CorrectionResponse,
            types::ErrorResponse
        ))
    )]
    struct ApiDoc;

    Router::new().merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
}

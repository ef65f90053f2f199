// handlers/portfolio.rs - portfolio create/update from multipart forms
//
// POST  /api/portfolio       multipart (or JSON) create
// PATCH /api/portfolio?id=   multipart (or JSON) partial update
//
// Form fields: title, description, technologies (comma-separated), liveUrl,
// repoUrl, categoryId and one `image` field per screenshot URL. Supplying any
// `image` field on update replaces the screenshot list.

use axum::{
    extract::{FromRequest, Multipart, Query, Request, State},
    http::header::CONTENT_TYPE,
};
use uuid::Uuid;

use super::resource::{parse_id, IdQuery};
use super::AppState;
use crate::database::models::portfolio::{CreatePortfolio, UpdatePortfolio};
use crate::database::models::{Portfolio, ValidationError};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, JsonBody};
use crate::services::ResourceService;

/// Raw form values before typing.
#[derive(Debug, Default, PartialEq)]
pub struct PortfolioForm {
    pub title: Option<String>,
    pub description: Option<String>,
    pub technologies: Option<String>,
    pub live_url: Option<String>,
    pub repo_url: Option<String>,
    pub category_id: Option<String>,
    pub images: Option<Vec<String>>,
}

impl PortfolioForm {
    pub fn set(&mut self, name: &str, value: String) {
        match name {
            "title" => self.title = Some(value),
            "description" => self.description = Some(value),
            "technologies" => self.technologies = Some(value),
            "liveUrl" => self.live_url = Some(value),
            "repoUrl" => self.repo_url = Some(value),
            "categoryId" => self.category_id = Some(value),
            "image" | "images" => self.images.get_or_insert_with(Vec::new).push(value),
            other => tracing::debug!("Ignoring unknown portfolio form field '{}'", other),
        }
    }

    pub fn into_payload(self) -> Result<CreatePortfolio, ValidationError> {
        let category_id = match self.category_id.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                Uuid::parse_str(raw)
                    .map_err(|_| ValidationError::invalid("categoryId", "categoryId must be a UUID"))?,
            ),
        };

        Ok(CreatePortfolio {
            title: self.title,
            description: self.description,
            technologies: self
                .technologies
                .map(|list| list.split(',').map(str::to_string).collect()),
            live_demo_url: self.live_url,
            github_url: self.repo_url,
            category_id,
            images: self.images,
        })
    }
}

async fn read_form(mut multipart: Multipart) -> Result<PortfolioForm, ApiError> {
    let mut form = PortfolioForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Malformed multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if field.file_name().is_some() {
            return Err(ApiError::bad_request(format!(
                "Field '{}' must be a URL, not a file upload",
                name
            )));
        }
        let value = field
            .text()
            .await
            .map_err(|e| ApiError::bad_request(format!("Malformed multipart field '{}': {}", name, e)))?;
        form.set(&name, value);
    }
    Ok(form)
}

fn is_multipart(request: &Request) -> bool {
    request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"))
}

async fn read_payload(state: &AppState, request: Request) -> Result<CreatePortfolio, ApiError> {
    if is_multipart(&request) {
        let multipart = Multipart::from_request(request, state)
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        Ok(read_form(multipart).await?.into_payload()?)
    } else {
        let JsonBody(payload) = JsonBody::<CreatePortfolio>::from_request(request, state).await?;
        Ok(payload)
    }
}

pub async fn create_portfolio(State(state): State<AppState>, request: Request) -> ApiResult<Portfolio> {
    let payload = read_payload(&state, request).await?;
    let service = ResourceService::<Portfolio>::new(state.pool.clone());
    Ok(ApiResponse::created(service.create(payload, None).await?))
}

pub async fn update_portfolio(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
    request: Request,
) -> ApiResult<Portfolio> {
    let id = parse_id(query.id.as_deref())?;
    let payload: UpdatePortfolio = read_payload(&state, request).await?.into();
    let service = ResourceService::<Portfolio>::new(state.pool.clone());
    Ok(ApiResponse::success(service.update(id, payload).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_fields_map_onto_the_payload() {
        let category = Uuid::new_v4();
        let mut form = PortfolioForm::default();
        form.set("title", "Shop".into());
        form.set("technologies", "rust, axum,,postgres".into());
        form.set("liveUrl", "https://shop.example.com".into());
        form.set("repoUrl", "https://github.com/example/shop".into());
        form.set("categoryId", category.to_string());
        form.set("image", "https://cdn/a.png".into());
        form.set("image", "https://cdn/b.png".into());

        let payload = form.into_payload().unwrap();
        assert_eq!(payload.title.as_deref(), Some("Shop"));
        assert_eq!(payload.category_id, Some(category));
        assert_eq!(payload.live_demo_url.as_deref(), Some("https://shop.example.com"));
        assert_eq!(payload.github_url.as_deref(), Some("https://github.com/example/shop"));
        assert_eq!(
            payload.images,
            Some(vec!["https://cdn/a.png".to_string(), "https://cdn/b.png".to_string()])
        );
        assert_eq!(payload.technologies.map(|t| t.len()), Some(4));
    }

    #[test]
    fn absent_image_fields_leave_screenshots_alone() {
        let mut form = PortfolioForm::default();
        form.set("title", "Renamed".into());
        let update: UpdatePortfolio = form.into_payload().unwrap().into();
        assert!(update.images.is_none());
    }

    #[test]
    fn bad_category_id_is_a_validation_error() {
        let mut form = PortfolioForm::default();
        form.set("categoryId", "not-a-uuid".into());
        assert_eq!(form.into_payload().unwrap_err().field, "categoryId");
    }
}

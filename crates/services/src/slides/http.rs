use async_trait::async_trait;
use lesson_core::model::{LessonSkeleton, Scope, Slide, Topic};
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::wire::{
    InitialSlidesEnvelope, NextSlideEnvelope, NextSlideRequest, SkeletonEnvelope, TopicRequest,
};
use super::{SlideClient, SlideResponse};
use crate::config::SlideApiConfig;
use crate::error::SlideClientError;

/// `SlideClient` over the JSON content API.
#[derive(Clone)]
pub struct HttpSlideClient {
    client: Client,
    config: SlideApiConfig,
}

impl HttpSlideClient {
    #[must_use]
    pub fn new(config: SlideApiConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &SlideApiConfig {
        &self.config
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, SlideClientError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = self.config.endpoint(path);
        let mut request = self.client.post(&url).json(body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::debug!(%url, %status, "content API returned an error status");
            return Err(SlideClientError::HttpStatus(status));
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| SlideClientError::Decode(e.to_string()))
    }
}

#[async_trait]
impl SlideClient for HttpSlideClient {
    async fn fetch_skeleton(
        &self,
        topic: &Topic,
        scope: &Scope,
    ) -> Result<LessonSkeleton, SlideClientError> {
        let body = TopicRequest {
            topic: topic.as_str(),
            school_id: scope.school_id(),
        };
        let envelope: SkeletonEnvelope = self.post("aulas/skeleton", &body).await?;
        Ok(envelope.into())
    }

    async fn fetch_initial_slides(
        &self,
        topic: &Topic,
        scope: &Scope,
    ) -> Result<Vec<Slide>, SlideClientError> {
        let body = TopicRequest {
            topic: topic.as_str(),
            school_id: scope.school_id(),
        };
        let envelope: InitialSlidesEnvelope = self.post("aulas/initial-slides", &body).await?;
        Ok(envelope.into())
    }

    async fn fetch_slide(
        &self,
        topic: &Topic,
        index: usize,
        scope: &Scope,
    ) -> Result<SlideResponse, SlideClientError> {
        let body = NextSlideRequest {
            topic: topic.as_str(),
            slide_number: index + 1,
            school_id: scope.school_id(),
        };
        let envelope: NextSlideEnvelope = self.post("aulas/next-slide", &body).await?;
        SlideResponse::try_from(envelope)
    }
}

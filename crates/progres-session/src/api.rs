//! Typed gateway calls on top of [`SessionManager::send`].

use progres_models::academic::{
    CcGrade, ExamGrade, PeriodReport, PeriodSummary, Registration, StudentCard, SubjectCoefficient,
};
use progres_models::calculator::{CalculatorRequest, CalculatorResponse};
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Result, SessionError};
use crate::manager::{SessionManager, server_message};

async fn api_error(response: Response, what: &str) -> SessionError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = server_message(&body)
        .unwrap_or_else(|| format!("Failed to fetch {what}: {}", status.as_u16()));
    SessionError::Api { status, message }
}

impl SessionManager {
    async fn fetch_list<T: DeserializeOwned>(&self, path: &str, what: &str) -> Result<Vec<T>> {
        let response = self.send(Method::GET, path, None).await?;
        if !response.status().is_success() {
            return Err(api_error(response, what).await);
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&body).unwrap_or_default())
    }

    async fn fetch_object<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        what: &str,
    ) -> Result<T> {
        let response = self.send(method, path, body).await?;
        if !response.status().is_success() {
            return Err(api_error(response, what).await);
        }
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| SessionError::InvalidResponse(e.to_string()))
    }

    pub async fn registrations(&self) -> Result<Vec<Registration>> {
        self.fetch_list("/student/data", "student data").await
    }

    pub async fn exam_reports(&self, registration_id: &str) -> Result<Vec<PeriodReport>> {
        self.fetch_list(&format!("/student/exams/{registration_id}"), "exam data")
            .await
    }

    pub async fn period_summaries(&self, registration_id: &str) -> Result<Vec<PeriodSummary>> {
        self.fetch_list(
            &format!("/student/exams/{registration_id}/summary"),
            "exam summary",
        )
        .await
    }

    /// Personal information. `None` when the gateway has nothing.
    pub async fn student_info(&self) -> Result<Option<Value>> {
        let response = self.send(Method::GET, "/student/info", None).await?;
        if !response.status().is_success() {
            return Err(api_error(response, "student info").await);
        }
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        Ok(serde_json::from_str(&body).ok().filter(|v: &Value| !v.is_null()))
    }

    pub async fn cc_grades(&self, card_id: &str) -> Result<Vec<CcGrade>> {
        self.fetch_list(&format!("/student/cc-grades/{card_id}"), "CC grades")
            .await
    }

    pub async fn exam_grades(&self, card_id: &str) -> Result<Vec<ExamGrade>> {
        self.fetch_list(&format!("/student/exam-grades/{card_id}"), "exam grades")
            .await
    }

    pub async fn subjects(&self, offer_id: &str, level_id: &str) -> Result<Vec<SubjectCoefficient>> {
        self.fetch_list(
            &format!("/student/subjects/{offer_id}/{level_id}"),
            "subjects",
        )
        .await
    }

    /// Base64 photo. `None` when the student has no photo.
    pub async fn photo(&self) -> Result<Option<String>> {
        let response = self.send(Method::GET, "/student/photo", None).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(api_error(response, "student photo").await);
        }

        let body = response.text().await?;
        let body = body.trim();
        if body.is_empty() {
            return Ok(None);
        }
        // JSON string or `null`; any other body is taken as the raw photo.
        match serde_json::from_str::<Value>(body) {
            Ok(Value::String(photo)) if !photo.is_empty() => Ok(Some(photo)),
            Ok(Value::Null) | Ok(Value::String(_)) => Ok(None),
            _ => Ok(Some(body.to_string())),
        }
    }

    pub async fn student_card(&self, card_id: &str) -> Result<StudentCard> {
        self.fetch_object(
            Method::GET,
            &format!("/student/card/{card_id}"),
            None,
            "student card",
        )
        .await
    }

    pub async fn calculator(
        &self,
        card_id: &str,
        request: &CalculatorRequest,
    ) -> Result<CalculatorResponse> {
        let body = serde_json::to_value(request)?;
        self.fetch_object(
            Method::POST,
            &format!("/student/calculator/{card_id}"),
            Some(&body),
            "calculator",
        )
        .await
    }
}

//! Emusys lesson API client
//!
//! `GET {base_url}/aulas` with the token and a date-time range as query
//! parameters; results are cursor-paginated (`paginacao.proximo_cursor`,
//! `paginacao.tem_mais`).

use super::{LessonApiError, LessonSource, RawLesson};
use async_trait::async_trait;
use ca_common::config::EmusysConfig;
use ca_common::time::LESSON_DATETIME_FORMAT;
use chrono::NaiveDateTime;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, warn};

const USER_AGENT: &str = concat!("ConfirmAula/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct LessonPage {
    #[serde(default)]
    items: Vec<WireLesson>,
    #[serde(default)]
    paginacao: Option<Pagination>,
}

#[derive(Debug, Deserialize)]
struct Pagination {
    #[serde(default)]
    proximo_cursor: Option<String>,
    #[serde(default)]
    tem_mais: bool,
}

#[derive(Debug, Deserialize)]
struct WireLesson {
    id: i64,
    #[serde(default)]
    categoria: Option<String>,
    #[serde(default)]
    curso_nome: Option<String>,
    data_hora_inicio: String,
    #[serde(default)]
    data_hora_fim: String,
    #[serde(default)]
    professores: Vec<WireTeacher>,
    #[serde(default)]
    alunos: Vec<WireStudent>,
    #[serde(default)]
    cancelada: bool,
}

#[derive(Debug, Deserialize)]
struct WireTeacher {
    #[serde(default)]
    nome: String,
}

#[derive(Debug, Deserialize)]
struct WireStudent {
    #[serde(default)]
    nome_aluno: String,
}

impl From<WireLesson> for RawLesson {
    fn from(wire: WireLesson) -> Self {
        RawLesson {
            id: wire.id,
            cancelled: wire.cancelada,
            teacher_names: wire.professores.into_iter().map(|p| p.nome).collect(),
            student_name: wire.alunos.into_iter().next().map(|a| a.nome_aluno),
            course_name: wire.curso_nome,
            category: wire.categoria,
            starts_at: wire.data_hora_inicio,
            ends_at: wire.data_hora_fim,
        }
    }
}

/// Paginating client for the lesson listing endpoint
pub struct EmusysClient {
    http_client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    max_records: usize,
}

impl EmusysClient {
    pub fn new(
        base_url: impl Into<String>,
        token: Option<String>,
        max_records: usize,
        timeout: Duration,
    ) -> Result<Self, LessonApiError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| LessonApiError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            max_records,
        })
    }

    pub fn from_config(config: &EmusysConfig) -> Result<Self, LessonApiError> {
        Self::new(
            config.base_url.clone(),
            config.resolved_token(),
            config.max_records,
            config.timeout(),
        )
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    async fn fetch_page(
        &self,
        token: &str,
        start: &str,
        end: &str,
        cursor: Option<&str>,
    ) -> Result<LessonPage, LessonApiError> {
        let url = format!("{}/aulas", self.base_url);
        let mut query: Vec<(&str, &str)> = vec![
            ("token", token),
            ("data_hora_inicial", start),
            ("data_hora_final", end),
        ];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor));
        }

        let response = self
            .http_client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&query)
            .send()
            .await
            .map_err(|e| LessonApiError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let excerpt: String = body.chars().take(200).collect();
            return Err(LessonApiError::Status(status.as_u16(), excerpt));
        }

        response
            .json()
            .await
            .map_err(|e| LessonApiError::Parse(e.to_string()))
    }
}

#[async_trait]
impl LessonSource for EmusysClient {
    async fn fetch_lessons_in_range(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<RawLesson>, LessonApiError> {
        let Some(token) = self.token.as_deref() else {
            error!("Emusys token not configured; set EMUSYS_TOKEN or [emusys].token");
            return Ok(Vec::new());
        };

        let start = start.format(LESSON_DATETIME_FORMAT).to_string();
        let end = end.format(LESSON_DATETIME_FORMAT).to_string();

        let mut lessons: Vec<RawLesson> = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self.fetch_page(token, &start, &end, cursor.as_deref()).await?;
            pages += 1;
            lessons.extend(page.items.into_iter().map(RawLesson::from));

            let (next, more) = match page.paginacao {
                Some(p) => (p.proximo_cursor.filter(|c| !c.is_empty()), p.tem_mais),
                None => (None, false),
            };

            if lessons.len() > self.max_records {
                warn!(
                    fetched = lessons.len(),
                    cap = self.max_records,
                    "Lesson fetch hit the record cap, stopping pagination"
                );
                break;
            }

            match next {
                Some(next) if more => cursor = Some(next),
                _ => break,
            }
        }

        debug!(pages, lessons = lessons.len(), %start, %end, "Fetched lessons");
        Ok(lessons)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_lesson_conversion() {
        let json = r#"{
            "id": 48213,
            "tipo": "aula",
            "categoria": "Aula Experimental",
            "turma_nome": "",
            "curso_nome": "Bateria",
            "data_hora_inicio": "2024-03-05 14:30:00",
            "data_hora_fim": "2024-03-05 15:20:00",
            "professores": [{"nome": "Aquiles Santos", "email": "a@b.c"}, {"nome": "Outro"}],
            "alunos": [{"nome_aluno": "Maria", "instrumento": "Bateria"}],
            "cancelada": false
        }"#;
        let wire: WireLesson = serde_json::from_str(json).unwrap();
        let raw = RawLesson::from(wire);

        assert_eq!(raw.id, 48213);
        assert_eq!(raw.teacher_names, vec!["Aquiles Santos".to_string(), "Outro".to_string()]);
        assert_eq!(raw.student_name.as_deref(), Some("Maria"));
        assert_eq!(raw.category.as_deref(), Some("Aula Experimental"));
        assert!(!raw.cancelled);
    }

    #[test]
    fn test_sparse_wire_lesson() {
        let json = r#"{"id": 7, "data_hora_inicio": "2024-03-05 08:00:00"}"#;
        let raw = RawLesson::from(serde_json::from_str::<WireLesson>(json).unwrap());

        assert!(raw.teacher_names.is_empty());
        assert_eq!(raw.student_name, None);
        assert_eq!(raw.course_name, None);
    }

    #[tokio::test]
    async fn test_missing_token_returns_no_lessons() {
        let client = EmusysClient::new("http://127.0.0.1:9", None, 5000, Duration::from_secs(1)).unwrap();
        let start = chrono::NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();

        let lessons = client.fetch_lessons_in_range(start, start).await.unwrap();
        assert!(lessons.is_empty());
        assert!(!client.has_token());
    }
}

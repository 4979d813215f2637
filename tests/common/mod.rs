//! Shared fixtures for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use syllabus::catalog::{CatalogIndex, Course, CourseCatalog, CoursePassage, Lesson};
use syllabus::embedding::HashingEmbedder;
use syllabus::llm::{CompletionRequest, CompletionResponse, ContentBlock, LlmClient, StopReason};
use syllabus::{Result, SyllabusError};

/// LLM stand-in that replays canned responses and records every request.
pub struct ScriptedLlm {
    responses: Mutex<VecDeque<CompletionResponse>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedLlm {
    pub fn new(responses: Vec<CompletionResponse>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn create_completion(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| SyllabusError::Llm("script exhausted".to_string()))
    }
}

pub fn answer(text: &str) -> CompletionResponse {
    CompletionResponse {
        stop_reason: StopReason::EndTurn,
        content: vec![ContentBlock::text(text)],
    }
}

pub fn call_tool(id: &str, name: &str, input: serde_json::Value) -> CompletionResponse {
    CompletionResponse {
        stop_reason: StopReason::ToolUse,
        content: vec![ContentBlock::ToolUse {
            id: id.to_string(),
            name: name.to_string(),
            input,
        }],
    }
}

pub const ML_TITLE: &str = "Introduction to Machine Learning";

pub fn ml_course() -> Course {
    Course {
        title: ML_TITLE.to_string(),
        course_link: Some("https://example.com/ml-course".to_string()),
        instructor: Some("Dr. Test Instructor".to_string()),
        lessons: vec![
            Lesson {
                lesson_number: 2,
                title: "Neural Networks".to_string(),
                lesson_link: Some("https://example.com/ml/2".to_string()),
            },
            Lesson {
                lesson_number: 0,
                title: "Course Overview".to_string(),
                lesson_link: Some("https://example.com/ml/0".to_string()),
            },
            Lesson {
                lesson_number: 1,
                title: "Linear Regression".to_string(),
                lesson_link: Some("https://example.com/ml/1".to_string()),
            },
        ],
    }
}

pub fn ml_passages() -> Vec<CoursePassage> {
    [
        (0, "Machine learning is a subset of artificial intelligence."),
        (1, "Linear regression predicts continuous values using a linear equation."),
        (2, "Neural networks are inspired by biological neural networks."),
    ]
    .into_iter()
    .map(|(lesson, content)| CoursePassage {
        content: content.to_string(),
        course_title: ML_TITLE.to_string(),
        lesson_number: Some(lesson),
        chunk_index: 0,
    })
    .collect()
}

/// Catalog over `index` holding the machine learning course.
pub async fn ml_catalog(index: Arc<dyn CatalogIndex>) -> CourseCatalog {
    let catalog = CourseCatalog::new(index, Arc::new(HashingEmbedder::default()), 5).unwrap();
    catalog.add_course_metadata(&ml_course()).await.unwrap();
    catalog.add_course_content(&ml_passages()).await.unwrap();
    catalog
}

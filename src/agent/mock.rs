//! Deterministic offline backend.
//!
//! Evaluation is keyword matching over the task text and the activity excerpt:
//! 1. a known distraction keyword in the activity (and not in the task) means Distracted;
//! 2. otherwise any shared concept between task and activity means On Track;
//! 3. otherwise Idle.
//!
//! Concepts are lower-cased alphanumeric tokens of at least three characters, minus
//! stop-words, with a light suffix stemmer, folded through groups of related terms.
//! The result depends only on the inputs, so two fresh mocks always agree.

use std::collections::BTreeSet;

use async_trait::async_trait;

use super::backend::{Backend, BackendJudgement};
use super::error::BackendError;
use crate::db::models::{Task, TaskDraft, Verdict};

const DISTRACTION_KEYWORDS: &[&str] = &[
    "reddit", "youtube", "twitter", "facebook", "instagram", "tiktok", "netflix", "twitch",
    "hulu", "imgur", "9gag", "espn", "shopping",
];

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "from", "that", "this", "into", "your", "you", "are", "was",
    "were", "has", "have", "had", "not", "but", "all", "any", "can", "will", "just", "about",
    "then", "than", "them", "they", "its", "our", "out", "get", "got", "set", "new", "add",
    "added", "adding", "edit", "edited", "editing", "update", "updated", "updating", "fix",
    "fixed", "fixing", "create", "created", "creating", "make", "made", "making", "use", "used",
    "using", "implement", "implemented", "implementing", "change", "changed", "changing",
    "file", "files", "code", "work", "working", "line", "lines", "also", "def", "var", "let",
    "const", "return", "import", "deleted", "some", "more", "very", "now", "here", "there",
];

/// Related terms share the first entry as their concept.
const CONCEPT_GROUPS: &[&[&str]] = &[
    &[
        "auth", "login", "logout", "signin", "signup", "password", "passwd", "session", "token",
        "credential", "hash", "oauth", "jwt", "authentication", "authenticate", "authorization",
    ],
    &[
        "api", "endpoint", "route", "routing", "router", "handler", "request", "response", "http",
        "rest", "controller",
    ],
    &[
        "ui", "button", "form", "css", "layout", "style", "styling", "component", "page", "view",
        "html", "modal", "navbar", "frontend",
    ],
    &[
        "db", "database", "sql", "schema", "migration", "query", "table", "sqlite", "postgres",
    ],
    &["test", "testing", "spec", "assert", "fixture", "pytest", "unittest"],
    &["doc", "docs", "readme", "documentation", "guide"],
    &["game", "snake", "player", "score", "sprite", "collision", "level"],
];

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|token| token.len() >= 3)
        .map(|token| token.to_ascii_lowercase())
}

fn stem(token: &str) -> String {
    let len = token.len();
    if len > 5 && token.ends_with("ing") {
        return token[..len - 3].to_string();
    }
    if len > 4 && (token.ends_with("ied") || token.ends_with("ies")) {
        return format!("{}y", &token[..len - 3]);
    }
    if len > 4 && token.ends_with("ed") {
        return token[..len - 2].to_string();
    }
    if len > 4
        && token.ends_with("es")
        && ["shes", "ches", "xes", "zes", "sses"]
            .iter()
            .any(|suffix| token.ends_with(suffix))
    {
        return token[..len - 2].to_string();
    }
    if len > 3 && token.ends_with('s') && !token.ends_with("ss") {
        return token[..len - 1].to_string();
    }
    token.to_string()
}

fn group_of(term: &str) -> Option<&'static str> {
    CONCEPT_GROUPS
        .iter()
        .find(|group| group.contains(&term))
        .map(|group| group[0])
}

/// Concept set of `text`; ordered so explanations are stable.
pub fn concepts(text: &str) -> BTreeSet<String> {
    tokens(text)
        .filter(|token| !STOPWORDS.contains(&token.as_str()))
        .filter_map(|token| {
            if let Some(group) = group_of(&token) {
                return Some(group.to_string());
            }
            let stemmed = stem(&token);
            if STOPWORDS.contains(&stemmed.as_str()) {
                return None;
            }
            Some(group_of(&stemmed).map(str::to_string).unwrap_or(stemmed))
        })
        .collect()
}

fn distraction_in(content: &str, task_text: &str) -> Option<&'static str> {
    let task_tokens: BTreeSet<String> = tokens(task_text).collect();
    let content_tokens: BTreeSet<String> = tokens(content).collect();
    DISTRACTION_KEYWORDS
        .iter()
        .copied()
        .find(|keyword| content_tokens.contains(*keyword) && !task_tokens.contains(*keyword))
}

/// The keyword judgement, without any persona wrapping.
pub fn judge(task: &Task, content: &str) -> BackendJudgement {
    let task_text = format!("{} {}", task.title, task.description);

    if let Some(keyword) = distraction_in(content, &task_text) {
        return BackendJudgement {
            verdict: Verdict::Distracted,
            message: None,
            reasoning: format!("I spotted {keyword} in your activity."),
        };
    }

    let task_concepts = concepts(&task_text);
    let activity_concepts = concepts(content);
    if let Some(shared) = task_concepts.intersection(&activity_concepts).next() {
        return BackendJudgement {
            verdict: Verdict::OnTrack,
            message: None,
            reasoning: format!("Your changes touch {shared}, right on task."),
        };
    }

    BackendJudgement {
        verdict: Verdict::Idle,
        message: None,
        reasoning: format!("Nothing here looks related to '{}' yet.", task.title),
    }
}

struct Template {
    keywords: &'static [&'static str],
    tasks: &'static [(&'static str, &'static str, u32)],
}

const TEMPLATES: &[Template] = &[
    Template {
        keywords: &["game", "snake", "tetris", "pong", "platformer"],
        tasks: &[
            ("Set up the game loop", "Create the window, clock and main update/draw loop.", 20),
            ("Draw the player", "Render the player entity and its starting position.", 15),
            ("Handle input", "Map keyboard input to player movement.", 20),
            ("Implement game rules", "Add collision detection and the core win/lose rules.", 30),
            ("Add scoring", "Track and display the score as the player progresses.", 20),
            ("Game over and restart", "Show a game-over screen and allow restarting.", 20),
            ("Polish and playtest", "Tune speed and difficulty, fix rough edges.", 15),
        ],
    },
    Template {
        keywords: &["api", "backend", "server", "rest", "graphql", "service"],
        tasks: &[
            ("Set up the project", "Initialize the repository, dependencies and a health endpoint.", 15),
            ("Design the data model", "Define the resources, fields and relations the API exposes.", 20),
            ("Implement core endpoints", "Build the main create/read/update/delete routes.", 30),
            ("Add validation and errors", "Validate request bodies and return consistent error responses.", 25),
            ("Add authentication", "Protect the endpoints with token-based authentication.", 30),
            ("Write integration tests", "Cover the main request flows end to end.", 25),
            ("Document the API", "Write usage docs with example requests and responses.", 15),
        ],
    },
    Template {
        keywords: &["cli", "tool", "command", "terminal", "script"],
        tasks: &[
            ("Parse arguments", "Define the commands, flags and help text.", 20),
            ("Implement the core command", "Build the main behaviour behind the primary command.", 30),
            ("Add configuration", "Load defaults from a config file and environment.", 20),
            ("Handle errors", "Report failures with clear messages and exit codes.", 15),
            ("Write tests", "Cover argument parsing and the core command.", 25),
            ("Write the README", "Document installation and usage examples.", 15),
        ],
    },
    Template {
        keywords: &["data", "ml", "model", "machine", "analysis", "dataset", "dashboard"],
        tasks: &[
            ("Load the dataset", "Read the raw data and inspect its shape and types.", 20),
            ("Clean the data", "Handle missing values, duplicates and outliers.", 25),
            ("Explore the data", "Plot distributions and note interesting relationships.", 25),
            ("Engineer features", "Derive the features the analysis or model needs.", 30),
            ("Build a baseline", "Train or compute a simple baseline result.", 30),
            ("Evaluate and report", "Measure results and summarize the findings.", 20),
        ],
    },
    Template {
        keywords: &["app", "mobile", "ios", "android", "flutter"],
        tasks: &[
            ("Scaffold the app", "Create the project and run it on a simulator.", 15),
            ("Build the main screen", "Lay out the primary screen with placeholder data.", 30),
            ("Add navigation", "Wire up navigation between the app's screens.", 20),
            ("Manage state", "Store and update the data the screens display.", 25),
            ("Persist data", "Save user data locally between launches.", 25),
            ("Polish the UI", "Refine spacing, colors and empty states.", 20),
        ],
    },
    Template {
        keywords: &["web", "website", "site", "landing", "frontend", "portfolio", "blog"],
        tasks: &[
            ("Set up the project structure", "Create the folders, entry page and build tooling.", 15),
            ("Build the page layout", "Add the header, main content area and footer.", 25),
            ("Create core components", "Build the reusable sections the pages share.", 30),
            ("Style the pages", "Apply typography, colors and spacing with CSS.", 20),
            ("Add interactivity", "Hook up forms, buttons and dynamic content.", 25),
            ("Make it responsive", "Adapt the layout for phones and tablets.", 20),
            ("Deploy", "Publish the site and check it in production.", 15),
        ],
    },
];

const GENERIC_TASKS: &[(&str, &str, u32)] = &[
    ("Clarify the requirements", "Write down what done looks like for", 15),
    ("Set up the workspace", "Create the project, repository and tooling.", 15),
    ("Build the core functionality", "Implement the single most important feature first.", 30),
    ("Add secondary features", "Build the next most valuable piece on top of the core.", 25),
    ("Test the happy path", "Check the main flow works end to end and fix what breaks.", 20),
    ("Polish and document", "Tidy up rough edges and write a short README.", 15),
];

/// Canned plan for `description`, chosen by its first matching keyword group.
pub fn template_drafts(description: &str) -> Vec<TaskDraft> {
    let words: BTreeSet<String> = tokens(description)
        .chain(
            description
                .split(|c: char| !c.is_ascii_alphanumeric())
                .filter(|w| w.len() == 2)
                .map(|w| w.to_ascii_lowercase()),
        )
        .collect();

    let template = TEMPLATES.iter().find(|template| {
        template
            .keywords
            .iter()
            .any(|keyword| words.contains(*keyword) || words.contains(&format!("{keyword}s")))
    });

    match template {
        Some(template) => template
            .tasks
            .iter()
            .map(|(title, details, minutes)| TaskDraft::new(*title, *details, *minutes))
            .collect(),
        None => GENERIC_TASKS
            .iter()
            .enumerate()
            .map(|(index, (title, details, minutes))| {
                let details = if index == 0 {
                    format!("{details} \"{}\".", description.trim())
                } else {
                    details.to_string()
                };
                TaskDraft::new(*title, details, *minutes)
            })
            .collect(),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MockBackend;

impl MockBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Backend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn evaluate(&self, task: &Task, content: &str) -> Result<BackendJudgement, BackendError> {
        Ok(judge(task, content))
    }

    async fn decompose(&self, description: &str) -> Result<Vec<TaskDraft>, BackendError> {
        Ok(template_drafts(description))
    }

    fn is_mock(&self) -> bool {
        true
    }
}

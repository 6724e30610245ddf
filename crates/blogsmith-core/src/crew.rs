// ABOUTME: Declarative crew configuration: agents, tasks, tool bindings, and the built-in blog crew.
// ABOUTME: Supports YAML loading, validation, and `{topic}` interpolation at kickoff.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::template::{Inputs, interpolate};

/// Default bound on an agent's tool-calling loop.
pub const DEFAULT_MAX_ITERATIONS: u32 = 15;

/// Errors raised while loading or validating a crew definition.
#[derive(Debug, Error)]
pub enum CrewError {
    #[error("crew has no agents")]
    NoAgents,

    #[error("crew has no tasks")]
    NoTasks,

    #[error("duplicate agent role: {0}")]
    DuplicateRole(String),

    #[error("task '{task}' is assigned to unknown agent '{agent}'")]
    UnknownAgent { task: String, agent: String },

    #[error("io error reading crew file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid crew yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// The external capabilities an agent may be granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    WebSearch,
    ScrapeWebsite,
    ReadNotes,
    SearchNotes,
}

impl ToolKind {
    pub fn label(&self) -> &'static str {
        match self {
            ToolKind::WebSearch => "web_search",
            ToolKind::ScrapeWebsite => "scrape_website",
            ToolKind::ReadNotes => "read_notes",
            ToolKind::SearchNotes => "search_notes",
        }
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A role/goal/backstory bundle paired with a tool set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentDefinition {
    pub role: String,
    pub goal: String,
    pub backstory: String,
    #[serde(default)]
    pub tools: Vec<ToolKind>,
    #[serde(default)]
    pub allow_delegation: bool,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
}

fn default_max_iterations() -> u32 {
    DEFAULT_MAX_ITERATIONS
}

impl AgentDefinition {
    fn interpolated(&self, inputs: &Inputs) -> Self {
        Self {
            role: interpolate(&self.role, inputs),
            goal: interpolate(&self.goal, inputs),
            backstory: interpolate(&self.backstory, inputs),
            ..self.clone()
        }
    }
}

/// One stage of the pipeline, bound to an agent by role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDefinition {
    pub name: String,
    pub description: String,
    pub expected_output: String,
    pub agent: String,
}

impl TaskDefinition {
    fn interpolated(&self, inputs: &Inputs) -> Self {
        Self {
            name: self.name.clone(),
            description: interpolate(&self.description, inputs),
            expected_output: interpolate(&self.expected_output, inputs),
            agent: interpolate(&self.agent, inputs),
        }
    }
}

/// How tasks are scheduled. Only sequential execution is supported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Process {
    #[default]
    Sequential,
}

/// An ordered set of tasks and the agents that perform them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrewDefinition {
    pub agents: Vec<AgentDefinition>,
    pub tasks: Vec<TaskDefinition>,
    #[serde(default)]
    pub process: Process,
}

impl CrewDefinition {
    /// Parse and validate a crew from YAML text.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, CrewError> {
        let crew: CrewDefinition = serde_yaml::from_str(yaml)?;
        crew.validate()?;
        Ok(crew)
    }

    /// Read, parse and validate a crew from a YAML file.
    pub fn from_yaml_file(path: &Path) -> Result<Self, CrewError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Check structural consistency: non-empty, unique roles, resolvable task agents.
    pub fn validate(&self) -> Result<(), CrewError> {
        if self.agents.is_empty() {
            return Err(CrewError::NoAgents);
        }
        if self.tasks.is_empty() {
            return Err(CrewError::NoTasks);
        }

        let mut roles = HashSet::new();
        for agent in &self.agents {
            if !roles.insert(agent.role.as_str()) {
                return Err(CrewError::DuplicateRole(agent.role.clone()));
            }
        }

        for task in &self.tasks {
            if !roles.contains(task.agent.as_str()) {
                return Err(CrewError::UnknownAgent {
                    task: task.name.clone(),
                    agent: task.agent.clone(),
                });
            }
        }

        Ok(())
    }

    /// Look up an agent by role.
    pub fn agent(&self, role: &str) -> Option<&AgentDefinition> {
        self.agents.iter().find(|a| a.role == role)
    }

    /// Return a copy with kickoff inputs substituted into every template.
    pub fn interpolated(&self, inputs: &Inputs) -> Self {
        Self {
            agents: self.agents.iter().map(|a| a.interpolated(inputs)).collect(),
            tasks: self.tasks.iter().map(|t| t.interpolated(inputs)).collect(),
            process: self.process,
        }
    }

    /// The default blog-building crew: strategist → writer → editor.
    pub fn blog_crew() -> Self {
        let strategist = AgentDefinition {
            role: "Senior Content Strategist".to_string(),
            goal: "Plan an outline for a blog post content to highlight new discoveries \
                   and educate your readers about {topic}"
                .to_string(),
            backstory: "You work for a fun startup that loves to tinker with new technologies. \
                You love your work and have a passion for structured communication. \
                Your expertise lies in organizing content effectively so it's easy to follow and understand. \
                You have a knack for dissecting huge chunks of information, highlighting the important points, \
                creating lesson plans, and sharing your learnings with other people."
                .to_string(),
            tools: vec![
                ToolKind::WebSearch,
                ToolKind::ScrapeWebsite,
                ToolKind::ReadNotes,
                ToolKind::SearchNotes,
            ],
            allow_delegation: false,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        };

        let writer = AgentDefinition {
            role: "Tech Blogger".to_string(),
            goal: "Craft a compelling blog post about {topic} based on given outline and notes"
                .to_string(),
            backstory: "You are a renowned tech blogger, known for your insightful and engaging articles \
                that are easy to follow and learn from. \
                You have years of experience writing guides about {topic}, learning reflections, \
                teaching and mentoring people. \
                You are excellent at synthesizing lots of information with clarity and brevity. \
                You like to make your articles fun to read, like metaphors and appropriately inserting \
                emojis where suitable. \
                You transform complex concepts into compelling narratives that is easy to understand."
                .to_string(),
            tools: vec![ToolKind::ReadNotes, ToolKind::SearchNotes],
            allow_delegation: true,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        };

        let editor = AgentDefinition {
            role: "Senior Blog Editor".to_string(),
            goal: "Proofread blogs to ensure the content is fun to read, informative, \
                   accurately includes the important points"
                .to_string(),
            backstory: "You work as a senior blog editor with years of experience in writing. \
                You have great attention to details, ensuring the concepts are best delivered, \
                well-written, and search engine optimized. \
                You take pride in only publishing the very best writing."
                .to_string(),
            tools: vec![ToolKind::ReadNotes, ToolKind::SearchNotes],
            allow_delegation: true,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        };

        let publication_ready = "A well-written blog post in markdown format, ready for publication, \
                                 each section should have 2 or 3 paragraphs.";

        let tasks = vec![
            TaskDefinition {
                name: "outline".to_string(),
                description: "Organize the insights provided from the notes into a blogpost outline. \
                    Highlight topics and subtopics to discuss in a way that ensures best learning \
                    experience and coherence."
                    .to_string(),
                expected_output: "Markdown text of the outline".to_string(),
                agent: strategist.role.clone(),
            },
            TaskDefinition {
                name: "draft".to_string(),
                description: "Following the outline and using the notes provided, develop an engaging \
                    blog post that reflects and highlights new learnings and educate readers about {topic}. \
                    Your post should be informative yet fun to read and easy to follow for a broad audience. \
                    Make it sound cool, avoid complex words so it doesn't sound like AI."
                    .to_string(),
                expected_output: publication_ready.to_string(),
                agent: writer.role.clone(),
            },
            TaskDefinition {
                name: "proofread".to_string(),
                description: "Using the notes and written draft, proofread the draft to make sure it \
                    delivers the concepts from the notes in a way that's easy to follow, correctly \
                    formatted and structured."
                    .to_string(),
                expected_output: publication_ready.to_string(),
                agent: editor.role.clone(),
            },
        ];

        Self {
            agents: vec![strategist, writer, editor],
            tasks,
            process: Process::Sequential,
        }
    }
}

//! Canned opening prompts offered on an empty draft, keyed by the signed-in user's role.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UserRole {
    #[default]
    #[serde(rename = "End User")]
    EndUser,
    #[serde(rename = "Business User")]
    BusinessUser,
}

impl UserRole {
    /// Unknown role strings fall back to `EndUser`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "Business User" => UserRole::BusinessUser,
            _ => UserRole::EndUser,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            UserRole::EndUser => "End User",
            UserRole::BusinessUser => "Business User",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StarterPrompt {
    pub title: &'static str,
    pub description: &'static str,
    pub query: &'static str,
}

static END_USER: [StarterPrompt; 3] = [
    StarterPrompt {
        title: "Start Application Guidance",
        description: "Get help with your application process.",
        query: "I need guidance for my application",
    },
    StarterPrompt {
        title: "Troubleshoot an Issue",
        description: "Resolve common problems.",
        query: "I need to troubleshoot an issue",
    },
    StarterPrompt {
        title: "Raise a Ticket",
        description: "Submit a support request.",
        query: "I want to raise a ticket",
    },
];

static BUSINESS_USER: [StarterPrompt; 3] = [
    StarterPrompt {
        title: "Search Documentation",
        description: "Find detailed policy information.",
        query: "Search for documentation",
    },
    StarterPrompt {
        title: "Check Required Documents",
        description: "Verify application requirements.",
        query: "What documents are required?",
    },
    StarterPrompt {
        title: "Raise Ticket for Applicant",
        description: "Submit a ticket on behalf of a user.",
        query: "Raise a ticket for an applicant",
    },
];

pub fn starter_prompts(role: UserRole) -> &'static [StarterPrompt] {
    match role {
        UserRole::EndUser => &END_USER,
        UserRole::BusinessUser => &BUSINESS_USER,
    }
}

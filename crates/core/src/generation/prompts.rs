//! Role-specific prompt construction.
//!
//! Each role has a fixed built-in instruction. A project may replace the
//! instruction for individual roles through `.autocrea/roles/<role>.md`;
//! those replacements are carried in [`PromptOverrides`].

use ac_protocol::Role;
use std::collections::HashMap;

/// Built-in instruction prefix for `role`.
pub fn role_instruction(role: Role) -> &'static str {
    match role {
        Role::Architect => {
            "Acting as the system architect, design the overall architecture for this project: \
             components and their responsibilities, data model, technology stack and folder \
             structure. Keep the justification of each decision to one sentence."
        }
        Role::Backend => {
            "Acting as the backend engineer, implement the server-side code: API routes, data \
             access and business logic. Follow the architecture decided above exactly."
        }
        Role::Frontend => {
            "Acting as the frontend engineer, implement the user interface: pages, components \
             and client-side state, wired to the backend API defined above."
        }
        Role::Devops => {
            "Acting as the DevOps engineer, write the build, container and CI/CD configuration \
             needed to run, test and deploy the code produced above."
        }
        Role::Security => {
            "Acting as the security reviewer, audit the design and code above. List each \
             vulnerability with its severity and provide corrected code where a fix is needed."
        }
    }
}

/// The task line handed to `role` for a project.
pub fn role_task(role: Role, project_name: &str) -> String {
    match role {
        Role::Architect => format!("Design the system architecture for \"{project_name}\"."),
        Role::Backend => format!("Write the backend code for \"{project_name}\"."),
        Role::Frontend => format!("Write the frontend code for \"{project_name}\"."),
        Role::Devops => format!("Write the deployment configuration for \"{project_name}\"."),
        Role::Security => format!("Review \"{project_name}\" for security issues."),
    }
}

/// Per-role replacements for the built-in instructions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptOverrides {
    instructions: HashMap<Role, String>,
}

impl PromptOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the instruction for `role`, returning the previous override.
    pub fn insert(&mut self, role: Role, instruction: impl Into<String>) -> Option<String> {
        self.instructions.insert(role, instruction.into())
    }

    pub fn get(&self, role: Role) -> Option<&str> {
        self.instructions.get(&role).map(String::as_str)
    }

    /// Override when present, built-in instruction otherwise.
    pub fn instruction_for(&self, role: Role) -> &str {
        self.get(role).unwrap_or_else(|| role_instruction(role))
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

/// Join instruction, project context, earlier role outputs and the task.
///
/// Empty sections are omitted.
pub fn build_prompt(
    instruction: &str,
    task: &str,
    context: Option<&str>,
    previous: &[(Role, String)],
) -> String {
    let mut prompt = String::from(instruction.trim());

    if let Some(context) = context.map(str::trim).filter(|c| !c.is_empty()) {
        prompt.push_str("\n\n## Project context\n");
        prompt.push_str(context);
    }

    if !previous.is_empty() {
        prompt.push_str("\n\n## Decisions from previous roles");
        for (role, output) in previous {
            prompt.push_str(&format!("\n\n### {role}\n{}", output.trim()));
        }
    }

    prompt.push_str("\n\n## Task\n");
    prompt.push_str(task.trim());
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_role_has_an_instruction() {
        for role in Role::ALL {
            assert!(role_instruction(role).starts_with("Acting as the"));
        }
    }

    #[test]
    fn test_build_prompt_minimal() {
        let prompt = build_prompt("Do it.", "Write code.", None, &[]);
        assert_eq!(prompt, "Do it.\n\n## Task\nWrite code.");
    }

    #[test]
    fn test_build_prompt_includes_previous_outputs_in_order() {
        let previous = vec![
            (Role::Architect, "Use a layered design.".to_string()),
            (Role::Backend, "fn handler() {}".to_string()),
        ];
        let prompt = build_prompt(
            role_instruction(Role::Frontend),
            "Write the UI.",
            Some("Project: shop\nAn online shop"),
            &previous,
        );

        let context_at = prompt.find("## Project context").unwrap();
        let architect_at = prompt.find("### architect").unwrap();
        let backend_at = prompt.find("### backend").unwrap();
        let task_at = prompt.find("## Task").unwrap();
        assert!(context_at < architect_at);
        assert!(architect_at < backend_at);
        assert!(backend_at < task_at);
        assert!(prompt.ends_with("Write the UI."));
    }

    #[test]
    fn test_blank_context_is_skipped() {
        let prompt = build_prompt("I.", "T.", Some("   "), &[]);
        assert!(!prompt.contains("Project context"));
    }

    #[test]
    fn test_overrides_replace_single_role() {
        let mut overrides = PromptOverrides::new();
        overrides.insert(Role::Security, "Focus on OWASP Top 10.");

        assert_eq!(overrides.instruction_for(Role::Security), "Focus on OWASP Top 10.");
        assert_eq!(
            overrides.instruction_for(Role::Backend),
            role_instruction(Role::Backend)
        );
        assert_eq!(overrides.len(), 1);
    }

    #[test]
    fn test_role_task_names_project() {
        assert!(role_task(Role::Devops, "todo").contains("\"todo\""));
    }
}

//! Human-readable pull-request guidance.
//!
//! Generates Markdown checklists for contributors who prefer to drive the
//! PR flow themselves, with the repository's live git status woven in.

use std::path::Path;

use crate::git::GitOps;

/// Parameters for the PR checklist.
#[derive(Debug, Clone)]
pub struct ChecklistRequest {
    /// Path to the local repository.
    pub local_repo_path: String,
    /// Base branch to merge into.
    pub base_branch: String,
    /// Branch containing the changes.
    pub head_branch: String,
    /// Proposed PR title.
    pub pr_title: String,
    /// Proposed PR description.
    pub pr_body: String,
    /// Whether the contributor is working from a fork.
    pub fork_flow: bool,
}

/// Generates the step-by-step PR creation checklist.
///
/// The status section degrades gracefully: when the path is not a
/// repository (or git fails), a warning line replaces the live status.
pub async fn pr_checklist(git: &GitOps, request: &ChecklistRequest) -> String {
    let mut lines: Vec<String> = Vec::new();
    let push = |lines: &mut Vec<String>, text: &str| lines.push(text.to_string());

    push(&mut lines, "# Pull Request Creation Guide");
    push(&mut lines, "");
    lines.push(format!("Repository: {}", request.local_repo_path));
    lines.push(format!("Base branch: {}", request.base_branch));
    lines.push(format!("Your branch: {}", request.head_branch));
    push(&mut lines, "");

    let status = git.status(Path::new(&request.local_repo_path)).await;
    let (current_branch, dirty) = match &status {
        Ok(status) => {
            lines.push(format!("Current branch: {}", status.current_branch));
            if status.has_uncommitted_changes {
                push(&mut lines, "⚠️  You have uncommitted changes");
            } else {
                push(&mut lines, "✓ Working tree is clean");
            }
            (status.current_branch.clone(), status.has_uncommitted_changes)
        },
        Err(error) => {
            lines.push(format!("⚠️  Warning: {error}"));
            ("unknown".to_string(), false)
        },
    };
    push(&mut lines, "");

    push(&mut lines, "## Step-by-Step Instructions");
    push(&mut lines, "");

    push(&mut lines, "### 1. Verify you're on the correct branch");
    push(&mut lines, "```bash");
    lines.push(format!("cd {}", request.local_repo_path));
    push(&mut lines, "git branch --show-current");
    push(&mut lines, "```");
    lines.push(format!("Expected output: `{}`", request.head_branch));
    push(&mut lines, "");
    if current_branch != request.head_branch {
        push(&mut lines, "⚠️  You're not on the expected branch! Switch with:");
        push(&mut lines, "```bash");
        lines.push(format!("git checkout {}", request.head_branch));
        push(&mut lines, "```");
        push(&mut lines, "");
    }

    push(&mut lines, "### 2. Ensure all changes are committed");
    push(&mut lines, "```bash");
    push(&mut lines, "git status");
    push(&mut lines, "```");
    push(&mut lines, "");
    if dirty {
        push(&mut lines, "⚠️  You have uncommitted changes. Commit them:");
        push(&mut lines, "```bash");
        push(&mut lines, "git add .");
        push(&mut lines, r#"git commit -m "Your commit message""#);
        push(&mut lines, "```");
        push(&mut lines, "");
    }

    push(&mut lines, "### 3. Run tests (recommended)");
    push(&mut lines, "");
    push(&mut lines, "Before creating a PR, make sure tests pass. Check the");
    push(&mut lines, "README or CONTRIBUTING.md for the project's test command.");
    push(&mut lines, "");

    push(&mut lines, "### 4. Push your branch to GitHub");
    push(&mut lines, "");
    if request.fork_flow {
        push(&mut lines, "Since you're working with a fork:");
    }
    push(&mut lines, "```bash");
    lines.push(format!("git push -u origin {}", request.head_branch));
    push(&mut lines, "```");
    push(&mut lines, "");

    push(&mut lines, "### 5. Create the Pull Request");
    push(&mut lines, "");
    push(&mut lines, "**Option A: Via GitHub Web Interface**");
    push(&mut lines, "");
    push(&mut lines, "1. Go to the repository on GitHub");
    push(&mut lines, "2. Click 'Pull requests', then 'New pull request'");
    lines.push(format!("3. Select base: {}", request.base_branch));
    lines.push(format!("4. Select compare: {}", request.head_branch));
    lines.push(format!("5. Title: {}", request.pr_title));
    if !request.pr_body.is_empty() {
        lines.push(format!("6. Description: {}", request.pr_body));
    }
    push(&mut lines, "");
    push(&mut lines, "**Option B: Via GitHub CLI (gh)**");
    push(&mut lines, "");
    push(&mut lines, "```bash");
    lines.push(format!(
        r#"gh pr create --base {} --head {} --title "{}" --body "{}""#,
        request.base_branch, request.head_branch, request.pr_title, request.pr_body
    ));
    push(&mut lines, "```");
    push(&mut lines, "");

    push(&mut lines, "## Additional Tips");
    push(&mut lines, "");
    push(
        &mut lines,
        "- **Link to the issue**: Mention 'Fixes #123' or 'Closes #123' in your PR description",
    );
    push(
        &mut lines,
        "- **Keep PRs focused**: One PR should address one issue or feature",
    );
    push(
        &mut lines,
        "- **Update documentation**: If you changed functionality, update relevant docs",
    );
    push(&mut lines, "");

    push(&mut lines, "## Troubleshooting");
    push(&mut lines, "");
    push(&mut lines, "**If push is rejected:**");
    push(&mut lines, "```bash");
    lines.push(format!("git pull origin {}", request.base_branch));
    push(&mut lines, "# Resolve conflicts if any, then push again");
    lines.push(format!("git push origin {}", request.head_branch));
    push(&mut lines, "```");

    lines.join("\n")
}

/// Generates the one-time-setup and per-contribution fork workflow guide.
#[must_use]
pub fn fork_workflow_guide() -> String {
    let mut lines: Vec<&str> = Vec::new();

    lines.push("# Fork Workflow Guide");
    lines.push("");
    lines.push("When contributing to repositories you don't have write access to,");
    lines.push("you typically use the fork workflow:");
    lines.push("");
    lines.push("## One-Time Setup");
    lines.push("");
    lines.push("```bash");
    lines.push("# 1. Fork the repository on GitHub (use the Fork button)");
    lines.push("");
    lines.push("# 2. Clone YOUR fork");
    lines.push("git clone https://github.com/YOUR-USERNAME/REPO-NAME.git");
    lines.push("cd REPO-NAME");
    lines.push("");
    lines.push("# 3. Add the original repository as 'upstream'");
    lines.push("git remote add upstream https://github.com/ORIGINAL-OWNER/REPO-NAME.git");
    lines.push("");
    lines.push("# 4. Verify remotes");
    lines.push("git remote -v");
    lines.push("```");
    lines.push("");
    lines.push("## For Each Contribution");
    lines.push("");
    lines.push("```bash");
    lines.push("# 1. Sync with upstream");
    lines.push("git checkout main");
    lines.push("git fetch upstream");
    lines.push("git merge upstream/main");
    lines.push("");
    lines.push("# 2. Create a feature branch");
    lines.push("git checkout -b feature/my-contribution");
    lines.push("");
    lines.push("# 3. Make your changes and commit");
    lines.push("git add .");
    lines.push(r#"git commit -m "Description""#);
    lines.push("");
    lines.push("# 4. Push to YOUR fork");
    lines.push("git push -u origin feature/my-contribution");
    lines.push("");
    lines.push("# 5. Create PR on GitHub (base: upstream main, head: your branch)");
    lines.push("```");

    lines.join("\n")
}

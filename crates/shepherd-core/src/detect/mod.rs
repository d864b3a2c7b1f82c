//! Project-type detection for post-clone guidance.
//!
//! Inspects marker files in a freshly cloned repository and produces setup
//! hints a contributor would otherwise dig out of the README.

use std::path::Path;

use serde::Serialize;

/// Detected project types and the corresponding setup hints.
#[derive(Debug, Clone, Serialize)]
pub struct Detection {
    /// Recognized project types, e.g. `"Rust"`, `"Python (Poetry)"`.
    pub project_types: Vec<String>,
    /// Ordered setup suggestions.
    pub setup_hints: Vec<String>,
}

/// Detects project type(s) from marker files in `repo_path`.
#[must_use]
pub fn detect_project(repo_path: &Path) -> Detection {
    let mut types = Vec::new();
    let mut hints = Vec::new();
    let has = |name: &str| repo_path.join(name).exists();

    if has("pyproject.toml") {
        types.push("Python (pyproject.toml)".to_string());
        hints.push("Install dependencies: pip install -e .".to_string());
    } else if has("requirements.txt") {
        types.push("Python (requirements.txt)".to_string());
        hints.push("Install dependencies: pip install -r requirements.txt".to_string());
    } else if has("setup.py") {
        types.push("Python (setup.py)".to_string());
        hints.push("Install dependencies: pip install -e .".to_string());
    } else if has("Pipfile") {
        types.push("Python (Pipenv)".to_string());
        hints.push("Install dependencies: pipenv install".to_string());
    } else if has("poetry.lock") {
        types.push("Python (Poetry)".to_string());
        hints.push("Install dependencies: poetry install".to_string());
    }

    if has("package.json") {
        types.push("Node.js".to_string());
        if has("yarn.lock") {
            hints.push("Install dependencies: yarn install".to_string());
        } else if has("pnpm-lock.yaml") {
            hints.push("Install dependencies: pnpm install".to_string());
        } else {
            hints.push("Install dependencies: npm install".to_string());
        }
    }

    if has("CMakeLists.txt") {
        types.push("C/C++ (CMake)".to_string());
        hints.push("Build: mkdir build && cd build && cmake .. && make".to_string());
    } else if has("Makefile") {
        types.push("C/C++ (Makefile)".to_string());
        hints.push("Build: make".to_string());
    }

    if has("Cargo.toml") {
        types.push("Rust".to_string());
        hints.push("Build: cargo build".to_string());
        hints.push("Run tests: cargo test".to_string());
    }

    if has("go.mod") {
        types.push("Go".to_string());
        hints.push("Install dependencies: go mod download".to_string());
        hints.push("Build: go build".to_string());
    }

    if has("pom.xml") {
        types.push("Java (Maven)".to_string());
        hints.push("Build: mvn clean install".to_string());
    } else if has("build.gradle") || has("build.gradle.kts") {
        types.push("Java (Gradle)".to_string());
        hints.push("Build: ./gradlew build".to_string());
    }

    if has("Gemfile") {
        types.push("Ruby".to_string());
        hints.push("Install dependencies: bundle install".to_string());
    }

    if has("Dockerfile") {
        hints.push("Docker support detected. Build: docker build -t <image-name> .".to_string());
    }
    if has("docker-compose.yml") || has("docker-compose.yaml") {
        hints.push("Docker Compose support detected. Run: docker-compose up".to_string());
    }

    if has("README.md") || has("README") {
        hints.insert(0, "Read README for setup instructions".to_string());
    }
    if has("CONTRIBUTING.md") {
        hints.push("Read CONTRIBUTING.md for contribution guidelines".to_string());
    }

    if ["test", "tests", "__tests__", "spec"].into_iter().any(|dir| has(dir)) {
        hints.push("Run tests (check README for test commands)".to_string());
    }

    if types.is_empty() {
        types.push("Unknown".to_string());
    }
    if hints.is_empty() {
        hints.push("Check README for setup instructions".to_string());
    }

    Detection {
        project_types: types,
        setup_hints: hints,
    }
}

/// Renders the post-clone next-steps block.
#[must_use]
pub fn format_next_steps(repo_path: &Path, repo_name: &str, current_branch: &str) -> String {
    let detection = detect_project(repo_path);

    let mut output = String::from("Repository cloned successfully!\n\n");
    output.push_str(&format!("Repository: {repo_name}\n"));
    output.push_str(&format!("Local path: {}\n", repo_path.display()));
    output.push_str(&format!("Current branch: {current_branch}\n\n"));
    output.push_str(&format!(
        "Project type(s): {}\n\n",
        detection.project_types.join(", ")
    ));
    output.push_str("Next steps:\n");
    for (index, hint) in detection.setup_hints.iter().enumerate() {
        output.push_str(&format!("{}. {hint}\n", index + 1));
    }
    output
}

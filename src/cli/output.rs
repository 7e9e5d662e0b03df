//! Shared output formatting for CLI commands

use anyhow::{Context, Result};
use serde::Serialize;

use crate::secrets::SecretDescription;
use crate::storage::MigrationInfo;

/// Print data as pretty JSON on stdout
pub fn print_json<T: Serialize>(data: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(data).context("Failed to serialize to JSON")?;
    println!("{}", json);
    Ok(())
}

/// Truncate string to maximum length with ellipsis
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        format!("{}...", s.chars().take(max_len.saturating_sub(3)).collect::<String>())
    }
}

/// Print a secret's versions and labels as a table
pub fn print_description_table(description: &SecretDescription) {
    println!("Secret: {}", description.secret_id);
    println!();
    println!("{:<40} {:<30}", "Version", "Labels");
    println!("{}", "-".repeat(70));

    for (version_id, labels) in &description.versions {
        let labels = if labels.is_empty() {
            "-".to_string()
        } else {
            labels.iter().map(|l| l.as_str()).collect::<Vec<_>>().join(", ")
        };
        println!("{:<40} {:<30}", truncate(version_id, 38), labels);
    }
}

/// Print migrations in a formatted table
pub fn print_migrations_table(migrations: &[MigrationInfo]) {
    println!();
    println!("{:<15} {:<50} {:<25} {:<10}", "Version", "Description", "Applied On", "Time (ms)");
    println!("{}", "-".repeat(100));

    for migration in migrations {
        println!(
            "{:<15} {:<50} {:<25} {:<10}",
            migration.version,
            truncate(&migration.description, 48),
            migration.installed_on.format("%Y-%m-%d %H:%M:%S"),
            migration.execution_time
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::StageLabel;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a-very-long-version-identifier", 10), "a-very-...");
    }

    #[test]
    fn test_truncate_multibyte_version_id() {
        let version_id = "é".repeat(30);
        assert_eq!(truncate(&version_id, 30), version_id);
        assert_eq!(truncate(&version_id, 20), format!("{}...", "é".repeat(17)));

        let mut description = SecretDescription {
            secret_id: "prod/app-db".to_string(),
            versions: Default::default(),
        };
        description.versions.insert("ü".repeat(40), vec![StageLabel::Pending]);
        print_description_table(&description);
    }
}

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::models::{Skill, SkillCategory, SkillId};

/// What to do with a skill name the vocabulary does not know
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownSkillPolicy {
    /// Fail the whole ingestion with `NotFound`
    Reject,
    /// Drop the name and log it
    Discard,
    /// Register it as a new canonical skill under `Other`
    #[default]
    Register,
}

/// Built-in vocabulary: (canonical name, category, aliases)
const DEFAULT_VOCABULARY: &[(&str, SkillCategory, &[&str])] = &[
    ("TypeScript", SkillCategory::Programming, &["ts"]),
    ("JavaScript", SkillCategory::Programming, &["js", "ecmascript"]),
    ("Python", SkillCategory::Programming, &["py", "python3"]),
    ("React", SkillCategory::Frontend, &["react.js", "reactjs"]),
    ("Next.js", SkillCategory::Frontend, &["nextjs"]),
    ("HTML", SkillCategory::Frontend, &["html5"]),
    ("CSS", SkillCategory::Frontend, &["css3"]),
    ("Tailwind CSS", SkillCategory::Frontend, &["tailwind", "tailwindcss"]),
    ("Redux", SkillCategory::Frontend, &["redux toolkit"]),
    ("Node.js", SkillCategory::Backend, &["node", "nodejs"]),
    ("Express", SkillCategory::Backend, &["express.js", "expressjs"]),
    ("GraphQL", SkillCategory::Backend, &["gql"]),
    ("MongoDB", SkillCategory::Database, &["mongo"]),
    ("SQL", SkillCategory::Database, &["postgresql", "mysql"]),
    ("AWS", SkillCategory::Cloud, &["amazon web services"]),
    ("Firebase", SkillCategory::Cloud, &[]),
    ("Vercel", SkillCategory::Cloud, &[]),
    ("Docker", SkillCategory::DevOps, &["containers"]),
    ("Kubernetes", SkillCategory::DevOps, &["k8s"]),
    ("Terraform", SkillCategory::DevOps, &[]),
    ("CI/CD", SkillCategory::DevOps, &["continuous integration"]),
    ("Linux", SkillCategory::DevOps, &[]),
    ("React Native", SkillCategory::Mobile, &["react-native"]),
    ("Expo", SkillCategory::Mobile, &[]),
    ("Pandas", SkillCategory::DataScience, &[]),
    ("scikit-learn", SkillCategory::DataScience, &["sklearn"]),
    ("TensorFlow", SkillCategory::DataScience, &["tf"]),
    ("PyTorch", SkillCategory::DataScience, &["torch"]),
    ("Figma", SkillCategory::Design, &[]),
    ("Design Systems", SkillCategory::Design, &["design system", "デザインシステム"]),
    ("Storybook", SkillCategory::Tools, &[]),
    ("Git", SkillCategory::Tools, &["github", "gitlab"]),
    ("Agile Development", SkillCategory::Management, &["agile", "アジャイル開発"]),
    ("Team Leadership", SkillCategory::Management, &["team lead", "チームリード経験"]),
    ("Scrum Master", SkillCategory::Management, &["scrum master certification", "scrum master資格"]),
    ("Project Management", SkillCategory::Management, &["プロジェクト管理"]),
    ("Coaching", SkillCategory::Management, &["コーチング"]),
];

/// Fold a raw skill name for alias lookup: trim, collapse whitespace, lowercase
pub fn fold_skill_name(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Derive the stable skill id from a canonical name
///
/// "Tailwind CSS" -> "tailwind-css", "Node.js" -> "node.js"
pub fn skill_id_for(canonical_name: &str) -> SkillId {
    fold_skill_name(canonical_name)
        .split(|c: char| c == ' ' || c == '_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Controlled skill vocabulary with an alias table
#[derive(Debug, Clone, Default)]
pub struct SkillNormalizer {
    skills: HashMap<SkillId, Skill>,
    aliases: HashMap<String, SkillId>,
    epoch: u64,
}

impl SkillNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Vocabulary pre-loaded with the built-in skill list
    pub fn with_defaults() -> Self {
        let mut normalizer = Self::new();
        for (name, category, aliases) in DEFAULT_VOCABULARY {
            let aliases: Vec<String> = aliases.iter().map(|a| a.to_string()).collect();
            if let Err(e) = normalizer.register(name, *category, &aliases) {
                tracing::warn!("Skipping built-in skill {}: {}", name, e);
            }
        }
        normalizer
    }

    /// Resolve free text to a canonical skill
    pub fn normalize(&self, raw: &str) -> Result<&Skill, EngineError> {
        let key = fold_skill_name(raw);
        self.aliases
            .get(&key)
            .and_then(|id| self.skills.get(id))
            .ok_or_else(|| EngineError::NotFound(format!("skill '{}'", raw.trim())))
    }

    /// Register a canonical skill, or merge aliases into an existing one
    ///
    /// Fails with `DuplicateSkill` when the name exists under another
    /// category or an alias already belongs to a different skill. Nothing is
    /// modified on failure.
    pub fn register(
        &mut self,
        canonical_name: &str,
        category: SkillCategory,
        aliases: &[String],
    ) -> Result<Skill, EngineError> {
        let canonical_name = canonical_name.split_whitespace().collect::<Vec<_>>().join(" ");
        if canonical_name.is_empty() {
            return Err(EngineError::Validation("skill name must not be empty".to_string()));
        }

        let id = skill_id_for(&canonical_name);

        if let Some(existing) = self.skills.get(&id) {
            if existing.category != category {
                return Err(EngineError::DuplicateSkill(format!(
                    "'{}' is already registered under {}",
                    existing.canonical_name, existing.category
                )));
            }
        }

        let mut keys = vec![fold_skill_name(&canonical_name)];
        keys.extend(
            aliases
                .iter()
                .map(|alias| fold_skill_name(alias))
                .filter(|alias| !alias.is_empty()),
        );

        for key in &keys {
            if let Some(owner) = self.aliases.get(key) {
                if owner != &id {
                    return Err(EngineError::DuplicateSkill(format!(
                        "alias '{}' already resolves to '{}'",
                        key, owner
                    )));
                }
            }
        }

        let skill = self.skills.entry(id.clone()).or_insert_with(|| Skill {
            id: id.clone(),
            canonical_name: canonical_name.clone(),
            category,
            aliases: BTreeSet::new(),
        });
        skill.aliases.extend(
            aliases
                .iter()
                .map(|alias| alias.trim().to_string())
                .filter(|alias| !alias.is_empty()),
        );
        let registered = skill.clone();

        for key in keys {
            self.aliases.insert(key, id.clone());
        }

        tracing::debug!("Registered skill {} ({})", registered.canonical_name, registered.category);
        Ok(registered)
    }

    /// Explicitly move a skill to another category
    ///
    /// Bumps the vocabulary epoch when the category actually changes.
    pub fn recategorize(
        &mut self,
        name: &str,
        category: SkillCategory,
    ) -> Result<Skill, EngineError> {
        let id = self.normalize(name)?.id.clone();
        let skill = self
            .skills
            .get_mut(&id)
            .ok_or_else(|| EngineError::NotFound(format!("skill '{}'", id)))?;

        if skill.category != category {
            tracing::info!(
                "Recategorizing skill {}: {} -> {}",
                skill.canonical_name,
                skill.category,
                category
            );
            skill.category = category;
            self.epoch += 1;
        }

        Ok(skill.clone())
    }

    /// Resolve a list of raw names to unique skill ids, in first-seen order
    pub fn resolve_all(
        &mut self,
        names: &[String],
        policy: UnknownSkillPolicy,
    ) -> Result<Vec<SkillId>, EngineError> {
        let mut resolved: Vec<SkillId> = Vec::with_capacity(names.len());

        for name in names {
            let id = match self.normalize(name) {
                Ok(skill) => skill.id.clone(),
                Err(err) => match policy {
                    UnknownSkillPolicy::Reject => return Err(err),
                    UnknownSkillPolicy::Discard => {
                        tracing::warn!("Discarding unknown skill '{}'", name.trim());
                        continue;
                    }
                    UnknownSkillPolicy::Register => {
                        self.register(name, SkillCategory::Other, &[])?.id
                    }
                },
            };

            if !resolved.contains(&id) {
                resolved.push(id);
            }
        }

        Ok(resolved)
    }

    pub fn get(&self, skill_id: &str) -> Option<&Skill> {
        self.skills.get(skill_id)
    }

    pub fn category_of(&self, skill_id: &str) -> Option<SkillCategory> {
        self.skills.get(skill_id).map(|skill| skill.category)
    }

    /// Display name for a skill id, falling back to the id itself
    pub fn display_name<'a>(&'a self, skill_id: &'a str) -> &'a str {
        self.skills
            .get(skill_id)
            .map(|skill| skill.canonical_name.as_str())
            .unwrap_or(skill_id)
    }

    /// Monotonic counter bumped on every recategorization
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skill_id_for() {
        assert_eq!(skill_id_for("Tailwind CSS"), "tailwind-css");
        assert_eq!(skill_id_for("  Node.js "), "node.js");
        assert_eq!(skill_id_for("scikit_learn"), "scikit-learn");
    }

    #[test]
    fn test_normalize_folds_case_and_whitespace() {
        let normalizer = SkillNormalizer::with_defaults();

        assert_eq!(normalizer.normalize("  typescript ").unwrap().id, "typescript");
        assert_eq!(normalizer.normalize("TS").unwrap().id, "typescript");
        assert_eq!(normalizer.normalize("Tailwind    css").unwrap().id, "tailwind-css");
        assert_eq!(normalizer.normalize("デザインシステム").unwrap().id, "design-systems");
    }

    #[test]
    fn test_normalize_unknown_is_not_found() {
        let normalizer = SkillNormalizer::with_defaults();
        assert!(matches!(
            normalizer.normalize("COBOL"),
            Err(EngineError::NotFound(_))
        ));
    }

    #[test]
    fn test_register_conflicting_category() {
        let mut normalizer = SkillNormalizer::with_defaults();
        let err = normalizer
            .register("React", SkillCategory::Backend, &[])
            .unwrap_err();
        assert!(matches!(err, EngineError::DuplicateSkill(_)));

        // Category unchanged
        assert_eq!(normalizer.category_of("react"), Some(SkillCategory::Frontend));
    }

    #[test]
    fn test_register_same_category_merges_aliases() {
        let mut normalizer = SkillNormalizer::with_defaults();
        let skill = normalizer
            .register("react", SkillCategory::Frontend, &["React 18".to_string()])
            .unwrap();

        assert_eq!(skill.canonical_name, "React");
        assert!(skill.aliases.contains("React 18"));
        assert_eq!(normalizer.normalize("react 18").unwrap().id, "react");
    }

    #[test]
    fn test_register_alias_owned_by_other_skill() {
        let mut normalizer = SkillNormalizer::with_defaults();
        let before = normalizer.len();
        let err = normalizer
            .register("Deno", SkillCategory::Backend, &["node".to_string()])
            .unwrap_err();

        assert!(matches!(err, EngineError::DuplicateSkill(_)));
        assert_eq!(normalizer.len(), before);
        assert!(normalizer.normalize("deno").is_err());
    }

    #[test]
    fn test_recategorize_bumps_epoch_only_on_change() {
        let mut normalizer = SkillNormalizer::with_defaults();
        assert_eq!(normalizer.epoch(), 0);

        normalizer.recategorize("Docker", SkillCategory::DevOps).unwrap();
        assert_eq!(normalizer.epoch(), 0);

        let skill = normalizer.recategorize("docker", SkillCategory::Cloud).unwrap();
        assert_eq!(skill.category, SkillCategory::Cloud);
        assert_eq!(normalizer.epoch(), 1);
    }

    #[test]
    fn test_resolve_all_policies() {
        let names = vec![
            "React".to_string(),
            "reactjs".to_string(),
            "Elm".to_string(),
        ];

        let mut normalizer = SkillNormalizer::with_defaults();
        assert!(normalizer
            .resolve_all(&names, UnknownSkillPolicy::Reject)
            .is_err());

        let ids = normalizer
            .resolve_all(&names, UnknownSkillPolicy::Discard)
            .unwrap();
        assert_eq!(ids, vec!["react".to_string()]);

        let ids = normalizer
            .resolve_all(&names, UnknownSkillPolicy::Register)
            .unwrap();
        assert_eq!(ids, vec!["react".to_string(), "elm".to_string()]);
        assert_eq!(normalizer.category_of("elm"), Some(SkillCategory::Other));
    }
}

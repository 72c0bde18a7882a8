use crate::naming::date_prefix;
use std::collections::HashSet;

/// What the cleanup pass intends to do with each local file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupPlan {
    /// Older than today and confirmed in the remote snapshot
    pub to_delete: Vec<String>,

    /// Older than today but missing from the remote snapshot
    pub unconfirmed: Vec<String>,

    /// Dated today or later
    pub current: Vec<String>,

    /// Names that do not match `YYYYMMDD.<tag>.pdf`
    pub ignored: Vec<String>,
}

impl CleanupPlan {
    pub fn is_empty(&self) -> bool {
        self.to_delete.is_empty()
    }
}

/// Sort local files into delete / keep buckets.
///
/// `today_key` is today's `YYYYMMDD`; keys compare chronologically as strings.
/// A file is only scheduled for deletion when its exact name is a title in
/// `remote_titles`.
pub fn build_cleanup_plan<S: AsRef<str>>(
    local_names: &[S],
    remote_titles: &HashSet<String>,
    today_key: &str,
) -> CleanupPlan {
    let mut plan = CleanupPlan::default();

    for name in local_names {
        let name = name.as_ref();
        let prefix = match date_prefix(name) {
            Some(prefix) => prefix,
            None => {
                plan.ignored.push(name.to_string());
                continue;
            }
        };

        if prefix >= today_key {
            plan.current.push(name.to_string());
        } else if remote_titles.contains(name) {
            plan.to_delete.push(name.to_string());
        } else {
            plan.unconfirmed.push(name.to_string());
        }
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titles(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_plan_deletes_only_confirmed_older_files() {
        let local = [
            "20240308.gdn.quick.pdf",
            "20240309.gdn.quick.pdf",
            "20240310.obs.speedy.pdf",
        ];
        let plan = build_cleanup_plan(&local, &titles(&["20240308.gdn.quick.pdf"]), "20240310");

        assert_eq!(plan.to_delete, vec!["20240308.gdn.quick.pdf"]);
        assert_eq!(plan.unconfirmed, vec!["20240309.gdn.quick.pdf"]);
        assert_eq!(plan.current, vec!["20240310.obs.speedy.pdf"]);
        assert!(plan.ignored.is_empty());
    }

    #[test]
    fn test_plan_never_deletes_today_or_future() {
        let local = ["20240310.obs.speedy.pdf", "20240311.gdn.quick.pdf"];
        let remote = titles(&local);
        let plan = build_cleanup_plan(&local, &remote, "20240310");

        assert!(plan.to_delete.is_empty());
        assert_eq!(plan.current.len(), 2);
    }

    #[test]
    fn test_plan_ignores_unmatched_names() {
        let local = [
            "gdn.quick.20240301.pdf",
            "notes.txt",
            "20240301.pdf",
            "20240301.gdn.quick.pdf.part",
        ];
        let plan = build_cleanup_plan(&local, &titles(&local), "20240310");

        assert!(plan.to_delete.is_empty());
        assert_eq!(plan.ignored.len(), 4);
    }

    #[test]
    fn test_plan_requires_exact_title_match() {
        let local = ["20240301.gdn.quick.pdf"];
        let remote = titles(&["20240301.gdn.quick.PDF", "gdn.quick.20240301.pdf"]);
        let plan = build_cleanup_plan(&local, &remote, "20240310");

        assert!(plan.to_delete.is_empty());
        assert_eq!(plan.unconfirmed, vec!["20240301.gdn.quick.pdf"]);
    }
}

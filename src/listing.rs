use stacked_errors::{bail, Result, StackableErr};

use crate::{Command, SnapshotStore};

// lines containing this are dropped from listings, it hides kubernetes
// pause/sidecar containers
const KUBE_MARKER: &str = "k8s";

/// Extracts the ordered container names from `docker ps` output: skips the
/// header line, drops blank lines and lines with kubernetes noise, and takes
/// the trailing NAMES field of each remaining line.
pub fn parse_listing(ps_stdout: &str) -> Vec<String> {
    ps_stdout
        .lines()
        .skip(1)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !line.contains(KUBE_MARKER))
        .filter_map(|line| line.split_whitespace().last())
        .map(str::to_owned)
        .collect()
}

/// Runs `docker ps` (`docker ps -a` if `all`), prints the numbered listing,
/// and replaces the stored snapshot with it. An empty listing clears the
/// snapshot and is an error.
pub async fn capture_listing(
    store: &SnapshotStore,
    all: bool,
    debug_forward: bool,
) -> Result<Vec<String>> {
    let mut command = Command::new("docker ps");
    if all {
        command = command.arg("-a");
    }
    let comres = command
        .debug(debug_forward)
        .run_to_completion()
        .await
        .stack_err("could not run `docker ps`")?;
    comres
        .assert_success()
        .stack_err("`docker ps` was not successful")?;
    let names = parse_listing(comres.stdout_as_utf8().stack()?);
    if names.is_empty() {
        store.clear().await.stack()?;
        bail!("no containers in listing")
    }
    for (i, name) in names.iter().enumerate() {
        println!("{}.{}", i + 1, name);
    }
    store.save(&names).await.stack()?;
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PS_OUTPUT: &str = "CONTAINER ID   IMAGE         COMMAND                  CREATED       \
                             STATUS       PORTS      NAMES\n1fe04cdff0e2   postgres:16   \
                             \"docker-entrypoint.s…\"   2 hours ago   Up 2 hours   5432/tcp   \
                             pg_main\nf00db1b8c045   k8s.gcr.io/pause:3.9   \"/pause\"           \
                             3 days ago    Up 3 days               k8s_POD_kube\n9a6532b7d413   \
                             redis:7       \"redis-server\"           5 min ago     Up 5 min     \
                             6379/tcp   cache\n";

    #[test]
    fn header_is_skipped_and_names_are_last_fields() {
        assert_eq!(parse_listing(PS_OUTPUT), vec!["pg_main", "cache"]);
    }

    #[test]
    fn kubernetes_lines_are_dropped() {
        assert!(!parse_listing(PS_OUTPUT).iter().any(|n| n.contains("k8s")));
    }

    #[test]
    fn empty_and_header_only_outputs_list_nothing() {
        assert!(parse_listing("").is_empty());
        assert!(parse_listing("CONTAINER ID   IMAGE   NAMES\n").is_empty());
    }
}

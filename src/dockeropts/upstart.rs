use super::{EditError, Editor};

const DOCKER_OPTS_KEY: &str = "DOCKER_OPTS=";

/// Rewrites the first line containing `DOCKER_OPTS=` in an upstart
/// defaults file (`/etc/default/docker`). When no such line exists the
/// assignment is appended, so an empty file is synthesized into a valid one.
#[derive(Debug, Default, Clone, Copy)]
pub struct UpstartCfgEditor;

impl Editor for UpstartCfgEditor {
    fn change_opts(&self, contents: &str, args: &str) -> Result<String, EditError> {
        let cfg = format!("{DOCKER_OPTS_KEY}\"{args}\"");
        let mut replaced = false;

        let mut out: Vec<&str> = contents
            .lines()
            .map(|line| {
                if !replaced && line.contains(DOCKER_OPTS_KEY) {
                    replaced = true;
                    cfg.as_str()
                } else {
                    line
                }
            })
            .collect();

        if !replaced {
            out.push(&cfg);
        }
        Ok(out.join("\n"))
    }
}

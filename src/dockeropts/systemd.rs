use super::{EditError, Editor};
use regex::Regex;
use std::sync::OnceLock;

const EXEC_START: &str = "ExecStart=";
const DOCKER_BIN: &str = "/usr/bin/docker";

/// Replaces the `ExecStart=` line of a systemd unit with
/// `ExecStart=/usr/bin/docker <args>`. A unit without that line is rejected
/// rather than patched, since the unit is unusable without it.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemdUnitEditor;

fn exec_start_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^ExecStart=.*$").expect("static regex"))
}

impl Editor for SystemdUnitEditor {
    fn change_opts(&self, contents: &str, args: &str) -> Result<String, EditError> {
        let re = exec_start_line();
        if !re.is_match(contents) {
            return Err(EditError::DirectiveNotFound {
                directive: EXEC_START,
            });
        }

        let line = format!("{EXEC_START}{DOCKER_BIN} {args}");
        Ok(re
            .replace_all(contents, regex::NoExpand(line.as_str()))
            .into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNIT: &str = "[Unit]
Description=Docker Application Container Engine
Documentation=http://docs.docker.com
After=network.target docker.socket
Requires=docker.socket

[Service]
ExecStart=/usr/bin/docker -d -H fd://
MountFlags=slave
LimitNOFILE=1048576
LimitNPROC=1048576
LimitCORE=infinity

[Install]
WantedBy=multi-user.target
";

    #[test]
    fn test_replaces_exec_start_line() {
        let out = SystemdUnitEditor.change_opts(UNIT, "--tlsverify").unwrap();
        let expected = UNIT.replace(
            "ExecStart=/usr/bin/docker -d -H fd://",
            "ExecStart=/usr/bin/docker --tlsverify",
        );
        assert_eq!(out, expected);
    }

    #[test]
    fn test_missing_exec_start_fails() {
        let err = SystemdUnitEditor.change_opts("FooBar", "--tlsverify").unwrap_err();
        assert_eq!(
            err,
            EditError::DirectiveNotFound {
                directive: "ExecStart="
            }
        );
    }

    #[test]
    fn test_is_idempotent() {
        let once = SystemdUnitEditor
            .change_opts(UNIT, "daemon -H=fd:// --tlsverify")
            .unwrap();
        let twice = SystemdUnitEditor
            .change_opts(&once, "daemon -H=fd:// --tlsverify")
            .unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_args_with_dollar_signs_are_literal() {
        let out = SystemdUnitEditor.change_opts(UNIT, "$DOCKER_OPTS").unwrap();
        assert!(out.contains("ExecStart=/usr/bin/docker $DOCKER_OPTS\n"));
    }
}

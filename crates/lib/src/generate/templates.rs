//! Text templates for generated artifacts.
//!
//! Paths are always single-quoted. Bridge keys from the manifest are shell
//! text and are inserted verbatim.

/// Interpreter line shared by every generated script.
pub const SHEBANG: &str = "#!/bin/sh";

/// Where the build context is copied inside the image.
pub const IMAGE_STAGING_DIR: &str = "/app/temp";

/// Quote `value` for POSIX sh.
pub fn sh_quote(value: &str) -> String {
  if !value.is_empty()
    && value
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '.' | '_' | '-' | ':' | '+' | '=' | ','))
  {
    return value.to_string();
  }
  format!("'{}'", value.replace('\'', r"'\''"))
}

/// Quote `value` for a Dockerfile `ENV key="value"` directive.
pub fn dockerfile_quote(value: &str) -> String {
  format!("\"{}\"", escape_dockerfile(value))
}

/// Render `ENV PATH="<entries>:${PATH}"`. The entries are literal; only the
/// trailing `${PATH}` is expanded by the builder.
pub fn dockerfile_path_env(entries: &[&str]) -> String {
  let mut value = String::new();
  for entry in entries {
    value.push_str(&escape_dockerfile(entry));
    value.push(':');
  }
  format!("ENV PATH=\"{value}${{PATH}}\"")
}

fn escape_dockerfile(value: &str) -> String {
  value.replace('\\', r"\\").replace('"', "\\\"").replace('$', r"\$")
}

pub fn bridge_script(launcher: &str, app: &str) -> String {
  format!(
    "{SHEBANG}\n# dockerapp bridge for {app}\nexec {} bridge {} -- \"$@\"\n",
    sh_quote(launcher),
    sh_quote(app)
  )
}

/// Hands `entry_argv` to the bridge, followed by the caller's arguments.
pub fn entry_script(bridge: &str, entry_argv: &[String]) -> String {
  let words: Vec<String> = entry_argv.iter().map(|w| sh_quote(w)).collect();
  format!("{SHEBANG}\nexec {} {} \"$@\"\n", sh_quote(bridge), words.join(" "))
}

pub fn exposed_shim(bridge: &str, command: &str) -> String {
  format!("{SHEBANG}\nexec {} {command} \"$@\"\n", sh_quote(bridge))
}

pub fn container_shim(shim_dir: &str, command: &str) -> String {
  format!(
    "{SHEBANG}\nshim_dir={}\nPATH=\"${{PATH#\"$shim_dir\":}}\"\nexport PATH\nexec {command} \"$@\"\n",
    sh_quote(shim_dir)
  )
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn plain_values_are_not_quoted() {
    assert_eq!(sh_quote("/home/user/.dockerapp/apps/gimp/bridge"), "/home/user/.dockerapp/apps/gimp/bridge");
  }

  #[test]
  fn special_values_are_single_quoted() {
    assert_eq!(sh_quote("my dir"), "'my dir'");
    assert_eq!(sh_quote("it's"), r"'it'\''s'");
    assert_eq!(sh_quote(""), "''");
    assert_eq!(sh_quote("$HOME"), "'$HOME'");
  }

  #[test]
  fn dockerfile_values_are_escaped() {
    assert_eq!(dockerfile_quote("C.UTF-8"), "\"C.UTF-8\"");
    assert_eq!(dockerfile_quote("a \"b\" $c"), r#""a \"b\" \$c""#);
  }

  #[test]
  fn path_env_escapes_entries_but_expands_path() {
    assert_eq!(
      dockerfile_path_env(&["/home/John Doe/bin", "/opt/$x"]),
      r#"ENV PATH="/home/John Doe/bin:/opt/\$x:${PATH}""#
    );
  }

  #[test]
  fn entry_script_quotes_the_entry_command() {
    let argv: Vec<String> = ["sh", "-c", "exec app --x 'y z' && true \"$@\"", "app"]
      .iter()
      .map(|s| s.to_string())
      .collect();
    assert_eq!(
      entry_script("/r/apps/app/bridge", &argv),
      "#!/bin/sh\nexec /r/apps/app/bridge sh -c 'exec app --x '\\''y z'\\'' && true \"$@\"' app \"$@\"\n"
    );
  }

  #[test]
  fn container_shim_strips_its_own_directory() {
    let shim = container_shim("/x/bridge-in-bin", "xdg-open");
    assert!(shim.contains("shim_dir=/x/bridge-in-bin\n"));
    assert!(shim.contains("PATH=\"${PATH#\"$shim_dir\":}\""));
    assert!(shim.ends_with("exec xdg-open \"$@\"\n"));
  }
}

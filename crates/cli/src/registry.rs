//! Command registry behind `dockerapp help`.

use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Param {
  pub name: &'static str,
  #[serde(rename = "type")]
  pub ty: &'static str,
  pub optional: bool,
}

#[derive(Debug, Serialize)]
pub struct CommandInfo {
  pub name: &'static str,
  pub params: &'static [Param],
  pub returns: &'static str,
  pub summary: &'static str,
}

const fn required(name: &'static str, ty: &'static str) -> Param {
  Param {
    name,
    ty,
    optional: false,
  }
}

const fn optional(name: &'static str, ty: &'static str) -> Param {
  Param {
    name,
    ty,
    optional: true,
  }
}

const APP: &[Param] = &[required("app_name", "string")];
const APP_ARGS: &[Param] = &[required("app_name", "string"), optional("args", "string[]")];

pub static COMMANDS: &[CommandInfo] = &[
  CommandInfo {
    name: "install",
    params: &[required("package_path", "path")],
    returns: "path",
    summary: "Install a .dockerApp package",
  },
  CommandInfo {
    name: "pack",
    params: &[required("source_dir", "path"), optional("dest_path", "path")],
    returns: "path",
    summary: "Pack an app directory into a .dockerApp package",
  },
  CommandInfo {
    name: "bridge",
    params: APP_ARGS,
    returns: "exit code",
    summary: "Run a command in the app's shared session",
  },
  CommandInfo {
    name: "run",
    params: APP_ARGS,
    returns: "exit code",
    summary: "Run the app's entry command",
  },
  CommandInfo {
    name: "cleardata",
    params: APP,
    returns: "void",
    summary: "Delete all persisted data of an app",
  },
  CommandInfo {
    name: "clearcache",
    params: APP,
    returns: "void",
    summary: "Delete the app's temporary files",
  },
  CommandInfo {
    name: "rebuild",
    params: APP,
    returns: "path",
    summary: "Regenerate scripts and rebuild the app image",
  },
  CommandInfo {
    name: "help",
    params: &[],
    returns: "string",
    summary: "List every command with its parameters",
  },
  CommandInfo {
    name: "list",
    params: &[],
    returns: "app[]",
    summary: "List installed apps",
  },
  CommandInfo {
    name: "status",
    params: APP,
    returns: "session",
    summary: "Show the session state of an app",
  },
];

impl CommandInfo {
  /// `name (param:type, optional?:type) => returns`
  pub fn signature(&self) -> String {
    let params: Vec<String> = self
      .params
      .iter()
      .map(|p| format!("{}{}:{}", p.name, if p.optional { "?" } else { "" }, p.ty))
      .collect();
    format!("{} ({}) => {}", self.name, params.join(", "), self.returns)
  }
}

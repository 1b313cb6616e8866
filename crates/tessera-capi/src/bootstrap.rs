//! Node bootstrap content
//!
//! SSH and sudo configuration injected into control plane machines, plus the
//! Ignition config the bastion boots from.

use base64::{engine::general_purpose::STANDARD, Engine};
use minijinja::{context, Environment, UndefinedBehavior};

use tessera_common::{Error, Result};

use crate::constants::ADMIN_USER;
use crate::model::capi::{Encoding, File, User};

/// sshd configuration for control plane nodes
const NODE_SSHD_CONFIG: &str = "\
# Use most defaults for sshd configuration.
Subsystem sftp internal-sftp
ClientAliveInterval 180
UseDNS no
UsePAM yes
PrintLastLog no # handled by PAM
PrintMotd no # handled by PAM
# Non defaults (#100)
ClientAliveCountMax 2
PasswordAuthentication no
TrustedUserCAKeys /etc/ssh/trusted-user-ca-keys.pem
MaxAuthTries 5
LoginGraceTime 60
AllowTcpForwarding no
AllowAgentForwarding no
";

/// sshd configuration for the bastion, which must forward connections
const BASTION_SSHD_CONFIG: &str = "\
# Use most defaults for sshd configuration.
Subsystem sftp internal-sftp
ClientAliveInterval 180
UseDNS no
UsePAM yes
PrintLastLog no # handled by PAM
PrintMotd no # handled by PAM
# Non defaults (#100)
ClientAliveCountMax 2
PasswordAuthentication no
TrustedUserCAKeys /etc/ssh/trusted-user-ca-keys.pem
MaxAuthTries 5
LoginGraceTime 60
AllowTcpForwarding yes
AllowAgentForwarding yes
";

const SUDOERS_CONFIG: &str = "giantswarm ALL = (ALL) NOPASSWD: ALL\n";

/// Command run on control plane nodes after kubeadm
pub const RESTART_SSHD_COMMAND: &str = "service ssh restart";

/// Ignition v3 config for the bastion; file contents are data URLs
/// and every substituted value goes through `tojson`.
const BASTION_IGNITION: &str = r#"{
  "ignition": {
    "version": "3.2.0"
  },
  "passwd": {
    "users": [
      {
        "name": "giantswarm",
        "groups": ["sudo", "docker"],
        "shell": "/bin/bash",
        "uid": 1000
      }
    ]
  },
  "storage": {
    "files": [
      {
        "path": "/etc/hostname",
        "overwrite": true,
        "mode": 420,
        "contents": {
          "source": {{ ("data:," ~ cluster_name ~ "-bastion") | tojson }}
        }
      },
      {
        "path": "/etc/ssh/sshd_config",
        "overwrite": true,
        "mode": 384,
        "contents": {
          "source": {{ (data_url ~ sshd_config) | tojson }}
        }
      },
      {
        "path": "/etc/ssh/trusted-user-ca-keys.pem",
        "overwrite": true,
        "mode": 384,
        "contents": {
          "source": {{ (data_url ~ sso_public_key) | tojson }}
        }
      },
      {
        "path": "/etc/sudoers.d/giantswarm",
        "overwrite": true,
        "mode": 384,
        "contents": {
          "source": {{ (data_url ~ sudoers) | tojson }}
        }
      }
    ]
  },
  "systemd": {
    "units": [
      {
        "name": "sshd.socket",
        "enabled": true
      }
    ]
  }
}
"#;

const BASE64_DATA_URL: &str = "data:text/plain;charset=utf-8;base64,";

fn encode(content: &str) -> String {
    STANDARD.encode(content)
}

/// Files written to every control plane node
///
/// `sso_public_key` is the base64-encoded CA key trusted for SSH logins.
pub fn control_plane_files(sso_public_key: &str) -> Vec<File> {
    vec![
        File {
            path: "/etc/ssh/sshd_config".to_string(),
            owner: Some("root".to_string()),
            permissions: Some("640".to_string()),
            encoding: Some(Encoding::Base64),
            content: encode(NODE_SSHD_CONFIG),
        },
        File {
            path: "/etc/ssh/trusted-user-ca-keys.pem".to_string(),
            owner: Some("root".to_string()),
            permissions: Some("600".to_string()),
            encoding: Some(Encoding::Base64),
            content: sso_public_key.to_string(),
        },
        File {
            path: format!("/etc/sudoers.d/{ADMIN_USER}"),
            owner: Some("root".to_string()),
            permissions: Some("600".to_string()),
            encoding: Some(Encoding::Base64),
            content: encode(SUDOERS_CONFIG),
        },
    ]
}

/// Non-root administrative account on control plane nodes
pub fn admin_user() -> User {
    User {
        name: ADMIN_USER.to_string(),
        groups: Some("sudo".to_string()),
        shell: Some("/bin/bash".to_string()),
        ssh_authorized_keys: Vec::new(),
    }
}

/// Base64-encoded Ignition config for the bastion of `cluster_name`
pub fn bastion_ignition(cluster_name: &str, sso_public_key: &str) -> Result<String> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);

    let rendered = env
        .render_str(
            BASTION_IGNITION,
            context! {
                cluster_name => cluster_name,
                data_url => BASE64_DATA_URL,
                sshd_config => encode(BASTION_SSHD_CONFIG),
                sso_public_key => sso_public_key,
                sudoers => encode(SUDOERS_CONFIG),
            },
        )
        .map_err(|e| Error::template(format!("bastion ignition: {e}")))?;
    Ok(encode(&rendered))
}

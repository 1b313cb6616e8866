//! CLI commands

use std::path::Path;

use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};

use crate::Result;

pub mod get;
pub mod template;

/// Create a kube client, from an explicit kubeconfig path when one is given
pub async fn kube_client(kubeconfig: Option<&Path>) -> Result<Client> {
    let config = match kubeconfig {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path)
                .map_err(|e| crate::Error::command_failed(format!("{}: {e}", path.display())))?;
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .map_err(|e| crate::Error::command_failed(format!("{}: {e}", path.display())))?
        }
        None => Config::infer()
            .await
            .map_err(|e| crate::Error::command_failed(e.to_string()))?,
    };
    Ok(Client::try_from(config)?)
}

/// Render rows as a column-aligned table with headers
pub fn format_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let line = |cells: Vec<&str>| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = line(headers.to_vec());
    out.push('\n');
    for row in rows {
        out.push_str(&line(row.iter().map(String::as_str).collect()));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_columns_align_to_widest_cell() {
        let table = format_table(
            &["NAME", "NAMESPACE"],
            &[
                vec!["acme".into(), "org-acme".into()],
                vec!["initech".into(), "org-initech".into()],
            ],
        );
        assert_eq!(
            table,
            "NAME     NAMESPACE\nacme     org-acme\ninitech  org-initech\n"
        );
    }

    #[test]
    fn empty_table_prints_headers_only() {
        assert_eq!(format_table(&["NAME", "NAMESPACE"], &[]), "NAME  NAMESPACE\n");
    }
}

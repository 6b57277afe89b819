//! Tabular listings.

use std::io::Write;

use tabwriter::TabWriter;
use warden_core::NamespaceStatus;

use crate::settings::Settings;
use crate::wiring;

pub async fn namespaces(settings: &Settings) -> anyhow::Result<()> {
    let orch = wiring::orchestrator(settings).await?;
    let statuses = orch.list_namespaces().await?;
    print!("{}", render_table(&statuses)?);
    Ok(())
}

fn render_table(statuses: &[NamespaceStatus]) -> anyhow::Result<String> {
    let mut tw = TabWriter::new(vec![]);
    writeln!(tw, "NAME\tPHASE\tSTATUS\tMANAGED")?;
    for status in statuses {
        writeln!(
            tw,
            "{}\t{}\t{}%\t{}",
            status.name, status.phase, status.status, status.managed
        )?;
    }
    tw.flush()?;
    Ok(String::from_utf8(tw.into_inner()?)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::NamespacePhase;

    #[test]
    fn table_has_a_header_and_one_row_per_namespace() {
        let statuses = vec![
            NamespaceStatus {
                name: "alpha".to_string(),
                phase: NamespacePhase::Active,
                status: 100,
                managed: true,
            },
            NamespaceStatus {
                name: "zulu".to_string(),
                phase: NamespacePhase::Terminating,
                status: 0,
                managed: false,
            },
        ];

        let table = render_table(&statuses).unwrap();
        let lines: Vec<_> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("NAME"));
        assert!(lines[1].contains("alpha") && lines[1].contains("100%"));
        assert!(lines[2].contains("Terminating"));
    }
}

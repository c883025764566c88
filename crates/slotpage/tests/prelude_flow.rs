//! A host driving a framed shop through the prelude only.

use slotpage::prelude::*;

fn framed_shop(sticky_frame: bool) -> Result<Container<String>> {
    let frame = Template::new(["#########", "#XXXXXXX#", "#########"], 'X')?;
    let constraint = PlacementConstraint::builder().template(frame).build()?;
    let shop = Container::builder()
        .config(
            ContainerConfig::default()
                .with_rows(3)
                .with_title("Shop")
                .with_constraint(constraint),
        )
        .provider(move |_viewer: ViewerId, contents: &mut Contents<String>| {
            contents.extend_items((0..20).map(|n| format!("offer {n}")));
            let _ = if sticky_frame {
                contents.fill_border_sticky("pane".to_string())
            } else {
                contents.fill_border("pane".to_string())
            };
        })
        .build()?;
    Ok(shop)
}

#[test]
fn template_pages_fill_only_the_window() -> Result<()> {
    let shop = framed_shop(false)?;
    let mut registry = ContainerRegistry::new(BufferSurface::new(), TickScheduler::new());
    let viewer = ViewerId(4);
    registry.open(viewer, &shop)?;

    let current = registry.current(viewer).map(|c| c.contents().last_page());
    assert_eq!(current, Some(3));

    registry.next_page(viewer)?;
    registry.next_page(viewer)?;
    let cells = registry
        .surface()
        .viewed_cells(viewer)
        .map(<[Option<String>]>::to_vec)
        .unwrap_or_default();
    assert_eq!(cells.len(), 27);

    // Last page holds offers 14..20 in the window's first six cells.
    for (slot, n) in (10..16).zip(14..20) {
        assert_eq!(cells[slot].as_deref(), Some(format!("offer {n}").as_str()));
    }
    assert_eq!(cells[16], None);
    // Border panes are page-local and only set on the opening page.
    assert_eq!(cells[0], None);
    Ok(())
}

#[test]
fn sticky_frame_follows_the_viewer() -> Result<()> {
    let shop = framed_shop(true)?;
    let mut registry = ContainerRegistry::new(BufferSurface::new(), TickScheduler::new());
    let viewer = ViewerId(5);
    registry.open(viewer, &shop)?;
    registry.next_page(viewer)?;
    registry.next_page(viewer)?;

    let cells = registry
        .surface()
        .viewed_cells(viewer)
        .map(<[Option<String>]>::to_vec)
        .unwrap_or_default();
    for cell in [0, 8, 9, 17, 18, 26] {
        assert_eq!(cells[cell].as_deref(), Some("pane"), "cell {cell}");
    }
    assert_eq!(cells[10].as_deref(), Some("offer 14"));
    Ok(())
}

#[test]
fn errors_convert_into_the_facade_error() {
    let err: Error = Template::new(["#X", "#"], 'X').unwrap_err().into();
    assert!(err.to_string().contains("row 1"), "{err}");
}

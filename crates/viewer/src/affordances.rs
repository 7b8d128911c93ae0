use gridview_scene::{NodeId, SelectionEvent};

/// Whether the object editing controls are enabled. Driven purely by
/// selection events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EditAffordances {
    pub target: Option<NodeId>,
    pub can_edit: bool,
    pub can_delete: bool,
}

impl EditAffordances {
    pub fn on_selection(&mut self, event: &SelectionEvent) {
        match *event {
            SelectionEvent::Selected(node) => {
                *self = Self {
                    target: Some(node),
                    can_edit: true,
                    can_delete: true,
                };
            }
            SelectionEvent::Deselected(node) if self.target == Some(node) => {
                *self = Self::default();
            }
            SelectionEvent::Deselected(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn follows_selection() {
        let mut a = EditAffordances::default();
        a.on_selection(&SelectionEvent::Selected(NodeId(3)));
        assert!(a.can_edit && a.can_delete);
        a.on_selection(&SelectionEvent::Deselected(NodeId(3)));
        assert_eq!(a, EditAffordances::default());
    }

    #[test]
    fn stale_deselect_is_ignored() {
        let mut a = EditAffordances::default();
        a.on_selection(&SelectionEvent::Selected(NodeId(4)));
        a.on_selection(&SelectionEvent::Deselected(NodeId(3)));
        assert_eq!(a.target, Some(NodeId(4)));
    }
}

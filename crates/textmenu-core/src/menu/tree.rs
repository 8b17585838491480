impl<'a, B> Menu<'a, B>
where
    B: MenuButton,
{
    pub const fn new(config: MenuConfig) -> Self {
        Self {
            nodes: Vec::new(),
            buttons: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> MenuConfig {
        self.config
    }

    /// Registers a button supplied by the caller. Node teardown never drops it.
    pub fn add_button(&mut self, device: B) -> Result<ButtonId, MenuError> {
        self.alloc_button(ButtonSlot {
            device,
            owner: None,
        })
    }

    /// Hands a caller-supplied button back, unbinding it everywhere.
    pub fn release_button(&mut self, id: ButtonId) -> Result<B, MenuError> {
        if self.button_slot(id)?.owner.is_some() {
            return Err(MenuError::ButtonOwned);
        }
        self.take_button(id)
    }

    pub fn button(&self, id: ButtonId) -> Option<&B> {
        self.button_slot(id).ok().map(|slot| &slot.device)
    }

    pub fn button_mut(&mut self, id: ButtonId) -> Option<&mut B> {
        self.button_slot_mut(id).ok().map(|slot| &mut slot.device)
    }

    /// Builds a parentless menu bound to four caller-supplied buttons.
    pub fn create_root(&mut self, name: &str, buttons: ButtonSet) -> Result<NodeId, MenuError> {
        for binding in buttons.bindings().into_iter().flatten() {
            self.button_slot(binding.id())?;
        }

        let mut node = self.blank_node(name)?;
        node.buttons = buttons.bindings();
        let id = self.alloc_node(node)?;
        self.node_mut(id)?.active = Some(id);
        debug!("menu: root created id={:?} name={:?}", id, name);
        Ok(id)
    }

    /// Creates a sub-menu owned by `parent` and appends it as an entry there.
    ///
    /// The child borrows the parent's buttons and copies its header height.
    pub fn create_child(&mut self, parent: NodeId, name: &str) -> Result<NodeId, MenuError> {
        let (buttons, header_height, active) = {
            let parent_node = self.node(parent)?;
            if parent_node.entries.is_full() {
                return Err(MenuError::EntriesFull);
            }
            let mut buttons = [None; ButtonRole::COUNT];
            for (slot, binding) in buttons.iter_mut().zip(parent_node.buttons) {
                *slot = binding.map(|binding| ButtonBinding::Borrowed(binding.id()));
            }
            (buttons, parent_node.header_height, parent_node.active)
        };

        let mut node = self.blank_node(name)?;
        node.parent = Some(parent);
        node.buttons = buttons;
        node.header_height = header_height;
        node.active = active;
        let label = node.name.clone();
        let id = self.alloc_node(node)?;

        let entry = Entry {
            label,
            target: EntryTarget::OwnedMenu(id),
        };
        if self.node_mut(parent)?.entries.push(entry).is_err() {
            self.free_node(id);
            return Err(MenuError::EntriesFull);
        }
        debug!(
            "menu: child created id={:?} parent={:?} name={:?}",
            id, parent, name
        );
        Ok(id)
    }

    /// Appends a leaf entry. The action stays borrowed, never owned.
    pub fn add_leaf_entry(
        &mut self,
        node: NodeId,
        name: &str,
        action: &'a dyn LeafAction,
    ) -> Result<(), MenuError> {
        let entry = Entry {
            label: label_from(name)?,
            target: EntryTarget::Action(action),
        };
        self.node_mut(node)?
            .entries
            .push(entry)
            .map_err(|_| MenuError::EntriesFull)
    }

    /// Hangs an existing parentless node under `node` with its own label.
    ///
    /// Ownership does not move: the linked node is only unlinked, not freed,
    /// when `node` is destroyed.
    pub fn add_existing_sub_menu(
        &mut self,
        node: NodeId,
        name: &str,
        other: NodeId,
    ) -> Result<(), MenuError> {
        self.attach(node, name, other, EntryTarget::LinkedMenu(other))
    }

    /// Moves a parentless node under `new_parent`, which takes ownership.
    pub fn reparent(&mut self, node: NodeId, new_parent: NodeId) -> Result<(), MenuError> {
        let name = self.node(node)?.name.clone();
        self.attach(new_parent, &name, node, EntryTarget::OwnedMenu(node))
    }

    /// Removes `node` from its parent's entries, leaving it a free-standing root.
    pub fn detach(&mut self, node: NodeId) -> Result<(), MenuError> {
        let parent = self.node(node)?.parent.ok_or(MenuError::NoParent)?;

        let tree_root = self.root_of(parent)?;
        let tree_active = self.node(tree_root)?.active;

        {
            let parent_node = self.node_mut(parent)?;
            parent_node
                .entries
                .retain(|entry| entry.target.sub_menu() != Some(node));
            let last = parent_node.entries.len().saturating_sub(1);
            parent_node.cursor = parent_node.cursor.min(last);
            parent_node.scroll = parent_node.scroll.min(parent_node.cursor);
        }
        self.node_mut(node)?.parent = None;

        if tree_active.is_some_and(|active| self.is_ancestor_or_self(node, active)) {
            debug!(
                "menu: active node left with detached subtree node={:?}; falling back to {:?}",
                node, parent
            );
            self.set_active_node(parent, parent)?;
        }
        self.sync_active_view(node, node)
    }

    /// Frees `node`, every sub-menu it owns, and every button it owns.
    ///
    /// Linked sub-menus survive as free-standing roots.
    pub fn destroy(&mut self, node: NodeId) -> Result<(), MenuError> {
        if self.node(node)?.parent.is_some() {
            self.detach(node)?;
        }

        let mut pending: Vec<NodeId, MAX_MENU_NODES> = Vec::new();
        let _ = pending.push(node);
        while let Some(id) = pending.pop() {
            let Some(freed) = self.free_node(id) else {
                continue;
            };
            for entry in freed.entries.iter() {
                match entry.target {
                    EntryTarget::OwnedMenu(child) => {
                        let _ = pending.push(child);
                    }
                    EntryTarget::LinkedMenu(child) => {
                        if let Ok(child_node) = self.node_mut(child) {
                            child_node.parent = None;
                        }
                        self.sync_active_view(child, child)?;
                    }
                    EntryTarget::Action(_) => {}
                }
            }
            self.drop_buttons_owned_by(id);
            debug!("menu: node freed id={:?} name={:?}", id, freed.name.as_str());
        }
        Ok(())
    }

    /// Binds a button to `role`, dropping the previous occupant if this node
    /// owned it.
    pub fn bind_button(
        &mut self,
        node: NodeId,
        role: ButtonRole,
        button: ButtonId,
    ) -> Result<(), MenuError> {
        self.button_slot(button)?;
        let previous = self.node(node)?.buttons[role.index()];
        if let Some(ButtonBinding::Owned(old)) = previous {
            if old == button {
                return Ok(());
            }
            self.take_button(old)?;
        }
        self.node_mut(node)?.buttons[role.index()] = Some(ButtonBinding::Borrowed(button));
        Ok(())
    }

    /// Moves `device` into the menu as a button owned by `node` for `role`.
    ///
    /// A previously owned occupant of that role is dropped first. Callers that
    /// start from a raw role index go through `ButtonRole::try_from`.
    pub fn create_owned_button(
        &mut self,
        node: NodeId,
        role: ButtonRole,
        device: B,
    ) -> Result<ButtonId, MenuError> {
        if let Some(ButtonBinding::Owned(old)) = self.node(node)?.buttons[role.index()] {
            self.take_button(old)?;
        }
        let id = self.alloc_button(ButtonSlot {
            device,
            owner: Some(node),
        })?;
        self.node_mut(node)?.buttons[role.index()] = Some(ButtonBinding::Owned(id));
        debug!(
            "menu: owned button created node={:?} role={:?} id={:?}",
            node, role, id
        );
        Ok(id)
    }

    /// Makes `target` the active node for `node` and every ancestor of it.
    ///
    /// Both must hang in the same tree.
    pub fn set_active_node(&mut self, node: NodeId, target: NodeId) -> Result<(), MenuError> {
        if self.root_of(target)? != self.root_of(node)? {
            return Err(MenuError::ForeignNode);
        }
        let mut cursor = Some(node);
        while let Some(id) = cursor {
            let current = self.node_mut(id)?;
            current.active = Some(target);
            cursor = current.parent;
        }
        Ok(())
    }

    /// The node currently drawn for the tree containing `node`.
    ///
    /// The root's view is authoritative.
    pub fn active_node(&self, node: NodeId) -> Result<NodeId, MenuError> {
        let root = self.root_of(node)?;
        let active = self.node(root)?.active.ok_or(MenuError::NoActiveNode)?;
        self.node(active).map_err(|_| MenuError::NoActiveNode)?;
        Ok(active)
    }

    /// Installs `overlay` on `node` and every sub-menu currently below it.
    ///
    /// Sub-menus created later do not pick it up.
    pub fn set_overlay(
        &mut self,
        node: NodeId,
        overlay: Option<&'a dyn MenuOverlay>,
    ) -> Result<(), MenuError> {
        self.node(node)?;
        let mut pending: Vec<NodeId, MAX_MENU_NODES> = Vec::new();
        let _ = pending.push(node);
        while let Some(id) = pending.pop() {
            let current = self.node_mut(id)?;
            current.overlay = overlay;
            for child in current.entries.iter().filter_map(|entry| entry.target.sub_menu()) {
                let _ = pending.push(child);
            }
        }
        Ok(())
    }

    pub fn set_line_height(&mut self, node: NodeId, line_height: u16) -> Result<(), MenuError> {
        if line_height == 0 {
            return Err(MenuError::InvalidLineHeight);
        }
        self.node_mut(node)?.line_height = line_height;
        Ok(())
    }

    /// Zero restores "same as the line height".
    pub fn set_header_height(&mut self, node: NodeId, header_height: u16) -> Result<(), MenuError> {
        self.node_mut(node)?.header_height = header_height;
        Ok(())
    }

    pub fn line_height(&self, node: NodeId) -> Result<u16, MenuError> {
        Ok(self.node(node)?.line_height)
    }

    /// Effective header height, after the line-height fallback.
    pub fn header_height(&self, node: NodeId) -> Result<u16, MenuError> {
        Ok(self.node(node)?.header_height())
    }

    pub fn name(&self, node: NodeId) -> Result<&str, MenuError> {
        Ok(self.node(node)?.name.as_str())
    }

    pub fn parent(&self, node: NodeId) -> Result<NodeId, MenuError> {
        self.node(node)?.parent.ok_or(MenuError::NoParent)
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.node(node).is_ok()
    }

    pub fn button_binding(
        &self,
        node: NodeId,
        role: ButtonRole,
    ) -> Result<Option<ButtonBinding>, MenuError> {
        Ok(self.node(node)?.buttons[role.index()])
    }

    pub fn entry_count(&self, node: NodeId) -> Result<usize, MenuError> {
        Ok(self.node(node)?.entries.len())
    }

    pub fn entry_label(&self, node: NodeId, index: usize) -> Result<Option<&str>, MenuError> {
        Ok(self
            .node(node)?
            .entries
            .get(index)
            .map(|entry| entry.label.as_str()))
    }

    /// Sub-menu reached from entry `index`, if that entry is not a leaf.
    pub fn entry_sub_menu(&self, node: NodeId, index: usize) -> Result<Option<NodeId>, MenuError> {
        Ok(self
            .node(node)?
            .entries
            .get(index)
            .and_then(|entry| entry.target.sub_menu()))
    }

    pub fn cursor(&self, node: NodeId) -> Result<usize, MenuError> {
        Ok(self.node(node)?.cursor)
    }

    pub fn scroll_offset(&self, node: NodeId) -> Result<usize, MenuError> {
        Ok(self.node(node)?.scroll)
    }

    pub fn has_active_action(&self, node: NodeId) -> Result<bool, MenuError> {
        Ok(self.node(node)?.active_action.is_some())
    }

    fn attach(
        &mut self,
        node: NodeId,
        name: &str,
        other: NodeId,
        target: EntryTarget<'a>,
    ) -> Result<(), MenuError> {
        if self.node(other)?.parent.is_some() {
            return Err(MenuError::AlreadyParented);
        }
        if self.is_ancestor_or_self(other, node) {
            return Err(MenuError::WouldCycle);
        }

        let tree_active = self.active_node(node).ok();
        let entry = Entry {
            label: label_from(name)?,
            target,
        };
        self.node_mut(node)?
            .entries
            .push(entry)
            .map_err(|_| MenuError::EntriesFull)?;
        self.node_mut(other)?.parent = Some(node);

        if let Some(active) = tree_active {
            self.sync_active_view(other, active)?;
        }
        debug!(
            "menu: attached node={:?} under={:?} label={:?}",
            other, node, name
        );
        Ok(())
    }

    fn blank_node(&self, name: &str) -> Result<MenuNode<'a>, MenuError> {
        Ok(MenuNode {
            name: label_from(name)?,
            parent: None,
            active: None,
            entries: Vec::new(),
            buttons: [None; ButtonRole::COUNT],
            cursor: 0,
            scroll: 0,
            line_height: self.config.line_height,
            header_height: self.config.header_height,
            active_action: None,
            overlay: None,
        })
    }

    fn alloc_node(&mut self, node: MenuNode<'a>) -> Result<NodeId, MenuError> {
        let (index, generation) = alloc_slot(&mut self.nodes, node).ok_or_else(|| {
            warn!("menu: node arena full capacity={}", MAX_MENU_NODES);
            MenuError::NodesFull
        })?;
        Ok(NodeId { index, generation })
    }

    fn alloc_button(&mut self, slot: ButtonSlot<B>) -> Result<ButtonId, MenuError> {
        let (index, generation) = alloc_slot(&mut self.buttons, slot).ok_or_else(|| {
            warn!("menu: button pool full capacity={}", MAX_BUTTONS);
            MenuError::ButtonsFull
        })?;
        Ok(ButtonId { index, generation })
    }

    fn free_node(&mut self, id: NodeId) -> Option<MenuNode<'a>> {
        self.nodes
            .get_mut(id.index())
            .and_then(|slot| slot.take(id.generation))
    }

    /// Removes a button from the pool and clears every binding to it.
    fn take_button(&mut self, id: ButtonId) -> Result<B, MenuError> {
        let slot = self
            .buttons
            .get_mut(id.index())
            .and_then(|slot| slot.take(id.generation))
            .ok_or(MenuError::UnknownButton)?;

        for node in self.nodes.iter_mut().filter_map(|slot| slot.value.as_mut()) {
            for binding in node.buttons.iter_mut() {
                if binding.is_some_and(|binding| binding.id() == id) {
                    *binding = None;
                }
            }
        }
        debug!("menu: button removed id={:?} owner={:?}", id, slot.owner);
        Ok(slot.device)
    }

    fn drop_buttons_owned_by(&mut self, node: NodeId) {
        let mut owned: Vec<ButtonId, MAX_BUTTONS> = Vec::new();
        for (index, slot) in self.buttons.iter().enumerate() {
            if slot.value.as_ref().is_some_and(|button| button.owner == Some(node)) {
                let _ = owned.push(ButtonId {
                    index: index as u8,
                    generation: slot.generation,
                });
            }
        }
        for id in owned {
            let _ = self.take_button(id);
        }
    }

    fn node(&self, id: NodeId) -> Result<&MenuNode<'a>, MenuError> {
        self.nodes
            .get(id.index())
            .and_then(|slot| slot.get(id.generation))
            .ok_or(MenuError::UnknownNode)
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut MenuNode<'a>, MenuError> {
        self.nodes
            .get_mut(id.index())
            .and_then(|slot| slot.get_mut(id.generation))
            .ok_or(MenuError::UnknownNode)
    }

    fn button_slot(&self, id: ButtonId) -> Result<&ButtonSlot<B>, MenuError> {
        self.buttons
            .get(id.index())
            .and_then(|slot| slot.get(id.generation))
            .ok_or(MenuError::UnknownButton)
    }

    fn button_slot_mut(&mut self, id: ButtonId) -> Result<&mut ButtonSlot<B>, MenuError> {
        self.buttons
            .get_mut(id.index())
            .and_then(|slot| slot.get_mut(id.generation))
            .ok_or(MenuError::UnknownButton)
    }

    fn root_of(&self, node: NodeId) -> Result<NodeId, MenuError> {
        let mut current = node;
        while let Some(parent) = self.node(current)?.parent {
            current = parent;
        }
        Ok(current)
    }

    /// Whether `ancestor` lies on the parent chain of `node` (inclusive).
    fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.node(id).ok().and_then(|node| node.parent);
        }
        false
    }

    fn sync_active_view(&mut self, subtree: NodeId, active: NodeId) -> Result<(), MenuError> {
        let mut pending: Vec<NodeId, MAX_MENU_NODES> = Vec::new();
        let _ = pending.push(subtree);
        while let Some(id) = pending.pop() {
            let current = self.node_mut(id)?;
            current.active = Some(active);
            for child in current.entries.iter().filter_map(|entry| entry.target.sub_menu()) {
                let _ = pending.push(child);
            }
        }
        Ok(())
    }
}

/// Fills the first vacant slot, or appends one. `None` when the arena is full.
fn alloc_slot<T, const N: usize>(slots: &mut Vec<Slot<T>, N>, value: T) -> Option<(u8, u16)> {
    if let Some(index) = slots.iter().position(Slot::is_vacant) {
        let slot = &mut slots[index];
        slot.value = Some(value);
        return Some((index as u8, slot.generation));
    }

    let index = slots.len();
    slots
        .push(Slot {
            generation: 0,
            value: Some(value),
        })
        .ok()?;
    Some((index as u8, 0))
}

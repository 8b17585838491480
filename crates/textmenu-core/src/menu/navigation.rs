impl<'a, B> Menu<'a, B>
where
    B: MenuButton,
{
    /// Runs one poll for the tree containing `node`.
    ///
    /// Updates every bound button once, applies at most one navigation step on
    /// the active node, renders, and flushes `display` exactly once.
    pub fn poll<D>(&mut self, node: NodeId, display: &mut D) -> Result<PollOutcome, MenuError>
    where
        D: MenuDisplay,
    {
        let active = self.active_node(node)?;
        let outcome = self.step_and_draw(active, display);
        display.flush();
        outcome
    }

    fn step_and_draw<D>(&mut self, id: NodeId, display: &mut D) -> Result<PollOutcome, MenuError>
    where
        D: MenuDisplay,
    {
        let pressed = self.update_buttons(id)?;
        let is_pressed = |role: ButtonRole| pressed[role.index()];
        let visible_lines = self.node(id)?.visible_lines(display.height()).max(1);

        let running = self.node(id)?.active_action;

        if let Some(action) = running {
            if action.run(display) == ActionStatus::Continue {
                return Ok(PollOutcome::ActionRunning(id));
            }
            debug!("menu-nav: action finished node={:?}", id);
            self.node_mut(id)?.active_action = None;
        } else if is_pressed(ButtonRole::Back) {
            if let Some(parent) = self.node(id)?.parent {
                for reset in [id, parent] {
                    let node = self.node_mut(reset)?;
                    node.cursor = 0;
                    node.scroll = 0;
                }
                debug!("menu-nav: back node={:?} parent={:?}", id, parent);
                return self.redirect(id, parent, display);
            }
        } else if is_pressed(ButtonRole::Up) && self.node(id)?.cursor > 0 {
            let current = self.node_mut(id)?;
            current.cursor -= 1;
            if current.cursor < current.scroll {
                current.scroll -= 1;
            }
        } else if is_pressed(ButtonRole::Down)
            && self.node(id)?.cursor + 1 < self.node(id)?.entries.len()
        {
            let current = self.node_mut(id)?;
            current.cursor += 1;
            if current.cursor > current.scroll + visible_lines - 1 {
                current.scroll += 1;
            }
        } else if is_pressed(ButtonRole::Enter) {
            let current = self.node(id)?;
            let target = current.entries.get(current.cursor).map(|entry| entry.target);
            match target {
                Some(EntryTarget::Action(action)) => {
                    debug!("menu-nav: action started node={:?} cursor={}", id, current.cursor);
                    self.node_mut(id)?.active_action = Some(action);
                    if action.run(display) == ActionStatus::Continue {
                        return Ok(PollOutcome::ActionRunning(id));
                    }
                    debug!("menu-nav: action finished node={:?}", id);
                    self.node_mut(id)?.active_action = None;
                }
                Some(EntryTarget::OwnedMenu(child) | EntryTarget::LinkedMenu(child)) => {
                    debug!("menu-nav: enter node={:?} child={:?}", id, child);
                    return self.redirect(id, child, display);
                }
                None => {}
            }
        }

        self.draw_node(id, display)?;
        Ok(PollOutcome::MenuDrawn(id))
    }

    /// Moves the tree's active node to `target` and draws it this same poll.
    ///
    /// Button edges were consumed by the node that redirected, so `target`
    /// only renders.
    fn redirect<D>(
        &mut self,
        from: NodeId,
        target: NodeId,
        display: &mut D,
    ) -> Result<PollOutcome, MenuError>
    where
        D: MenuDisplay,
    {
        self.set_active_node(from, target)?;
        self.draw_node(target, display)?;
        Ok(PollOutcome::Redirected(target))
    }

    /// Updates each distinct device bound to `id` once and reports which roles
    /// saw a press edge.
    fn update_buttons(&mut self, id: NodeId) -> Result<[bool; ButtonRole::COUNT], MenuError> {
        let bindings = self.node(id)?.buttons;

        let mut updated: Vec<ButtonId, { ButtonRole::COUNT }> = Vec::new();
        for binding in bindings.iter().flatten() {
            let button = binding.id();
            if updated.contains(&button) {
                continue;
            }
            if let Ok(slot) = self.button_slot_mut(button) {
                slot.device.update_state();
            }
            let _ = updated.push(button);
        }

        let mut pressed = [false; ButtonRole::COUNT];
        for role in ButtonRole::ALL {
            pressed[role.index()] = bindings[role.index()]
                .and_then(|binding| self.button_slot(binding.id()).ok())
                .is_some_and(|slot| slot.device.was_pressed());
        }
        Ok(pressed)
    }
}

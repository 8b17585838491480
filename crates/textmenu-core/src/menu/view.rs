impl<'a, B> Menu<'a, B>
where
    B: MenuButton,
{
    /// Renders `id`'s header and the visible slice of its entries.
    fn draw_node<D>(&self, id: NodeId, display: &mut D) -> Result<(), MenuError>
    where
        D: MenuDisplay,
    {
        let node = self.node(id)?;
        let line_height = node.line_height.max(1) as i32;
        let header_height = node.header_height() as i32;

        display.clear();
        if let Some(overlay) = node.overlay {
            overlay.draw(display);
        }

        display.set_font(self.config.font);
        display.set_text_alignment(TextAlignment::Center);
        display.draw_text((display.width() / 2) as i32, 0, node.name.as_str());

        display.set_text_alignment(TextAlignment::Left);
        let first = node.scroll;
        let end = cmp::min(first + node.visible_lines(display.height()), node.entries.len());
        for (row, index) in (first..end).enumerate() {
            let y = header_height + row as i32 * line_height;
            display.draw_text(self.config.text_indent, y, node.entries[index].label.as_str());
            if index == node.cursor {
                display.draw_horizontal_line(
                    self.config.marker_x,
                    y + line_height / 2,
                    self.config.marker_width,
                );
            }
        }
        Ok(())
    }
}

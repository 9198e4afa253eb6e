//! The emulated 256x64 display, recorded as a list of draw commands.

pub const DISPLAY_WIDTH: i32 = 256;
pub const DISPLAY_HEIGHT: i32 = 64;

/// Brightest of the 16 grey levels.
pub const MAX_COLOUR: u8 = 15;

/// Commands kept per frame; anything beyond is dropped.
const MAX_COMMANDS: usize = 4096;

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Text {
        x: i32,
        y: i32,
        text: String,
        colour: u8,
    },
    Line {
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        colour: u8,
    },
    /// Filled when `filled`, outlined otherwise
    Rectangle {
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        colour: u8,
        filled: bool,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplayList {
    commands: Vec<DrawCommand>,
    dropped: usize,
}

impl DisplayList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
        self.dropped = 0;
    }

    pub fn push(&mut self, command: DrawCommand) {
        if self.commands.len() >= MAX_COMMANDS {
            self.dropped += 1;
            return;
        }
        self.commands.push(command);
    }

    pub fn text(&mut self, x: i64, y: i64, text: impl Into<String>, colour: i64) {
        self.push(DrawCommand::Text {
            x: coord(x),
            y: coord(y),
            text: text.into(),
            colour: colour_level(colour),
        });
    }

    pub fn line(&mut self, x1: i64, y1: i64, x2: i64, y2: i64, colour: i64) {
        self.push(DrawCommand::Line {
            x1: coord(x1),
            y1: coord(y1),
            x2: coord(x2),
            y2: coord(y2),
            colour: colour_level(colour),
        });
    }

    pub fn rectangle(&mut self, x1: i64, y1: i64, x2: i64, y2: i64, colour: i64, filled: bool) {
        self.push(DrawCommand::Rectangle {
            x1: coord(x1),
            y1: coord(y1),
            x2: coord(x2),
            y2: coord(y2),
            colour: colour_level(colour),
            filled,
        });
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Commands discarded since the last clear because the list was full.
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

// Off-screen coordinates are kept (lines may cross the edge) but bounded.
fn coord(v: i64) -> i32 {
    v.clamp(-(DISPLAY_WIDTH as i64) * 4, DISPLAY_WIDTH as i64 * 4) as i32
}

fn colour_level(v: i64) -> u8 {
    v.clamp(0, MAX_COLOUR as i64) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colours_and_coordinates_are_bounded() {
        let mut display = DisplayList::new();
        display.line(-5000, 0, 10, 70, 99);
        match &display.commands()[0] {
            DrawCommand::Line { x1, colour, y2, .. } => {
                assert_eq!(*x1, -1024);
                assert_eq!(*colour, 15);
                assert_eq!(*y2, 70);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn list_is_capped() {
        let mut display = DisplayList::new();
        for i in 0..(MAX_COMMANDS + 3) {
            display.text(0, 0, format!("{}", i), 15);
        }
        assert_eq!(display.len(), MAX_COMMANDS);
        assert_eq!(display.dropped(), 3);
        display.clear();
        assert!(display.is_empty());
        assert_eq!(display.dropped(), 0);
    }
}

use owo_colors::{OwoColorize, Stream};

use stagehand_lib::stage::Stage;

/// List stages in pipeline order.
pub fn cmd_stages() {
  for (index, stage) in Stage::ALL.iter().enumerate() {
    println!(
      "{}. {:<6} {}",
      index + 1,
      stage.as_str().if_supports_color(Stream::Stdout, |s| s.bold()),
      stage.description()
    );
  }
}

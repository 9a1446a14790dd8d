//! Built-in demo catalog served by `dispatch` and `repl`.
//!
//! A small bestiary answering `!beast`, `!tier` and `!echo` lines.

use std::sync::Arc;

use command_grammar_core::convert::{self, Shape};
use command_grammar_core::{
    Command, CommandDefinition, CommandGroup, Directory, Failure, FieldRegistry, GrammarConfig,
    GrammarOptions, Outcome, OutputTarget, StaticDirectory, fail,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Prefix every catalog command starts with.
pub const PREFIX: &str = "!";

/// Lowest fuzzy score accepted when resolving beast names.
const MIN_SCORE: f64 = 0.5;

const FIELDS_YAML: &str = r#"
fields:
  - name: tier
    pattern: "[Tt]?([1-5])"
    optional: true
    embedded_captures: 1
  - name: level
    pattern: "[Tt]?(\\d+)"
    embedded_captures: 1
  - name: words
    pattern: ".+"
"#;

/// A bestiary entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Beast {
    pub name: &'static str,
    pub tier: i64,
    pub habitat: &'static str,
}

static BEASTS: [Beast; 6] = [
    Beast {
        name: "Niffler",
        tier: 1,
        habitat: "Britain",
    },
    Beast {
        name: "Bowtruckle",
        tier: 2,
        habitat: "Western Europe",
    },
    Beast {
        name: "Occamy",
        tier: 4,
        habitat: "Far East",
    },
    Beast {
        name: "Hungarian Horntail",
        tier: 5,
        habitat: "Hungary",
    },
    Beast {
        name: "Horned Serpent",
        tier: 5,
        habitat: "North America",
    },
    Beast {
        name: "Thunderbird",
        tier: 4,
        habitat: "Arizona",
    },
];

/// Result type shared by every catalog command.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reply {
    Beast(Beast),
    Tier { tier: i64, beasts: Vec<String> },
    Echo { words: String },
}

#[derive(Debug, Deserialize)]
struct BeastQuery {
    tier: Option<i64>,
    words: String,
}

/// Builds the demo group rendering for `target`.
pub fn build(target: OutputTarget) -> Outcome<CommandGroup<Reply>> {
    let config = GrammarConfig::from_yaml_str(FIELDS_YAML)
        .map_err(|err| Failure::configuration(err.to_string()))?;
    let registry = config
        .registry()
        .map_err(|err| Failure::configuration(err.to_string()))?;
    let bestiary: Arc<dyn Directory<Beast>> = Arc::new(StaticDirectory::from_entries(
        BEASTS.iter().map(|beast| (beast.name, beast.clone())),
    ));

    let mut group = CommandGroup::new(PREFIX)
        .with_target(target)
        .with_default_formatter(OutputTarget::Embed, |reply: &Reply| {
            serde_json::to_string(reply).unwrap_or_default()
        });
    let commands: Vec<Box<dyn Command<Reply>>> = vec![
        Box::new(beast_command(&registry, config.options(), bestiary)?),
        Box::new(tier_command(&registry, config.options())?),
        Box::new(echo_command(&registry, config.options())?),
    ];
    group.add_commands(commands)?;
    debug!(commands = group.processor().len(), "Built demo catalog");
    Ok(group)
}

fn beast_command(
    registry: &FieldRegistry,
    options: GrammarOptions,
    bestiary: Arc<dyn Directory<Beast>>,
) -> Outcome<CommandDefinition<BeastQuery, Reply>> {
    let resolve = convert::lookup(bestiary, MIN_SCORE);
    CommandDefinition::builder("beast")
        .description("Look a beast up by name, optionally checking its tier")
        .template("!beast {{tier?}} {{words}}", registry, options)
        .converter(
            convert::object(
                Shape::new()
                    .field("tier", convert::integer())
                    .field("words", convert::string()),
                &["tier"],
            )
            .into_typed(),
        )
        .executor(move |query: BeastQuery| {
            let beast = resolve.convert(&serde_json::Value::String(query.words))?;
            match query.tier {
                Some(tier) if tier != beast.tier => {
                    fail(format!("{} is tier {}, not tier {tier}", beast.name, beast.tier))
                }
                _ => Ok(Reply::Beast(beast)),
            }
        })
        .formatter(OutputTarget::Text, render_text)
        .formatter(OutputTarget::Markdown, render_markdown)
        .build()
}

fn tier_command(
    registry: &FieldRegistry,
    options: GrammarOptions,
) -> Outcome<CommandDefinition<i64, Reply>> {
    let level = convert::integer().with_constraint(|tier: &i64| {
        if (1..=5).contains(tier) {
            Ok(())
        } else {
            Err(Failure::message(format!("tier {tier} is out of range 1-5")))
        }
    });
    CommandDefinition::builder("tier")
        .description("List every beast of a tier")
        .template("!tier {{level}}", registry, options)
        .converter(convert::field("level", level))
        .executor(|tier: i64| {
            let beasts = BEASTS
                .iter()
                .filter(|beast| beast.tier == tier)
                .map(|beast| beast.name.to_string())
                .collect();
            Ok(Reply::Tier { tier, beasts })
        })
        .formatter(OutputTarget::Text, render_text)
        .formatter(OutputTarget::Markdown, render_markdown)
        .build()
}

fn echo_command(
    registry: &FieldRegistry,
    options: GrammarOptions,
) -> Outcome<CommandDefinition<String, Reply>> {
    CommandDefinition::builder("echo")
        .description("Repeat the rest of the line")
        .template("!echo {{words}}", registry, options)
        .converter(convert::field("words", convert::string()))
        .executor(|words: String| Ok(Reply::Echo { words }))
        .formatter(OutputTarget::Text, render_text)
        .build()
}

fn render_text(reply: &Reply) -> String {
    match reply {
        Reply::Beast(beast) => format!("{} (tier {}, {})", beast.name, beast.tier, beast.habitat),
        Reply::Tier { tier, beasts } if beasts.is_empty() => format!("No tier {tier} beasts"),
        Reply::Tier { tier, beasts } => format!("Tier {tier}: {}", beasts.join(", ")),
        Reply::Echo { words } => words.clone(),
    }
}

fn render_markdown(reply: &Reply) -> String {
    match reply {
        Reply::Beast(beast) => format!(
            "**{}** (tier {})\n_{}_",
            beast.name, beast.tier, beast.habitat
        ),
        Reply::Tier { tier, beasts } => {
            let mut out = format!("## Tier {tier}\n");
            for name in beasts {
                out.push_str(&format!("- {name}\n"));
            }
            out.trim_end().to_string()
        }
        Reply::Echo { words } => words.clone(),
    }
}

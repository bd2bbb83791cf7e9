use async_trait::async_trait;

use jtelebot_core::{BotError, BotRequest, BotResponse, LocationResponse, Speech, TextResponse};

use crate::command::{Command, CommandContext};

/// `location <lat> <lon>` sends a map point. Missing coordinates are asked for
/// one at a time through the waiting store.
pub struct LocationHandler;

fn parse_coordinate(token: &str) -> Option<f64> {
    token.trim().replace(',', ".").parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Split "lat lon" or "lat, lon" into coordinate tokens.
fn coordinate_tokens(argument: &str) -> Vec<&str> {
    argument
        .split(|c: char| c.is_whitespace() || c == ';')
        .flat_map(|part| {
            // "55.75,37.61" without a space separates on the comma only when
            // both halves carry a decimal point.
            match part.split_once(',') {
                Some((a, b)) if a.contains('.') && b.contains('.') => vec![a, b],
                _ => vec![part],
            }
        })
        .map(|t| t.trim_end_matches(','))
        .filter(|t| !t.is_empty())
        .collect()
}

#[async_trait]
impl Command for LocationHandler {
    fn identifier(&self) -> &str {
        "location"
    }

    async fn parse(&self, request: &BotRequest, ctx: &CommandContext<'_>) -> Result<Vec<BotResponse>, BotError> {
        let message = request.message();
        let waiting = &ctx.services().waiting;

        let Some(argument) = message.command_argument.as_deref() else {
            waiting.add(message, self.identifier()).await?;
            return Ok(vec![TextResponse::reply_to(message, "Send the latitude and longitude").into()]);
        };

        let tokens = coordinate_tokens(argument);
        match tokens.as_slice() {
            [latitude] => {
                parse_coordinate(latitude).filter(|v| v.abs() <= 90.0).ok_or(Speech::WrongInput)?;
                let mut partial = message.clone();
                partial.command_argument = Some(latitude.to_string());
                waiting.add(&partial, self.identifier()).await?;
                Ok(vec![TextResponse::reply_to(message, "Now send the longitude").into()])
            }
            [latitude, longitude] => {
                let latitude = parse_coordinate(latitude).filter(|v| v.abs() <= 90.0).ok_or(Speech::WrongInput)?;
                let longitude = parse_coordinate(longitude).filter(|v| v.abs() <= 180.0).ok_or(Speech::WrongInput)?;
                Ok(vec![LocationResponse::reply_to(message, latitude, longitude).into()])
            }
            _ => Err(Speech::WrongInput.into()),
        }
    }
}

use base64::{Engine, prelude::BASE64_STANDARD};
use log::info;
use rouille::{Request, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    config::{Defaults, HttpConfig, LastFmConfig},
    domain::query::{DEFAULT_COUNT, MAX_COUNT, MIN_COUNT, Period, Query},
    http::error::ApiError,
    palette::{
        Palette, PaletteFetcher,
        render::{self, Presentation},
    },
};

pub struct HttpServer {
    fetcher: PaletteFetcher,
    lastfm: LastFmConfig,
    defaults: Defaults,
    pub config: HttpConfig,
}

impl HttpServer {
    pub fn new(
        fetcher: PaletteFetcher,
        lastfm: LastFmConfig,
        defaults: Defaults,
        config: HttpConfig,
    ) -> Self {
        Self {
            fetcher,
            lastfm,
            defaults,
            config,
        }
    }

    pub fn run(self) {
        let addr = format!("{}:{}", self.config.bind_addr, self.config.port);
        rouille::start_server(addr, move |request| self.handle_request(request));
    }

    fn handle_request(&self, request: &Request) -> Response {
        Self::log_request(request);

        let response = rouille::router!(request,
            (GET) (/) => {
                self.handle_index()
            },
            (GET) (/palette) => {
                self.handle_palette_page(request)
            },
            (GET) (/palette/image) => {
                self.handle_palette_png(request)
            },
            (GET) (/api/palette) => {
                self.handle_palette_json(request)
            },
            _ => Response::empty_404()
        );

        info!("Response: {} {}", request.method(), response.status_code);
        response
    }

    fn log_request(request: &Request) {
        info!("{} {}", request.method(), request.url());
    }

    /// Reads `user`, `period` and `limit`, falling back to the form defaults.
    fn parse_query(&self, request: &Request) -> Result<Query, ApiError> {
        let identity = request
            .get_param("user")
            .unwrap_or_else(|| self.defaults.identity.clone());
        let period = match request.get_param("period") {
            Some(p) => p.parse::<Period>()?,
            None => Period::SevenDays,
        };
        let count = match request.get_param("limit") {
            Some(l) => l
                .trim()
                .parse::<u32>()
                .map_err(|_| ApiError::BadRequest(format!("invalid album count '{l}'")))?,
            None => DEFAULT_COUNT,
        };
        Ok(Query::new(identity, period, count))
    }

    fn handle_index(&self) -> Response {
        let query = Query::new(self.defaults.identity.clone(), Period::SevenDays, DEFAULT_COUNT);
        Response::html(render_page(&query, ""))
    }

    fn handle_palette_page(&self, request: &Request) -> Response {
        let query = match self.parse_query(request) {
            Ok(q) => q,
            Err(e) => return e.into_response(),
        };

        let result = match self.lastfm.credentials() {
            Ok(credentials) => self.fetcher.fetch(&query, &credentials),
            Err(e) => {
                let page = render_page(&query, &notice("error", &e.to_string()));
                return Response::html(page).with_status_code(500);
            }
        };

        let fragment = match Presentation::from_result(&result) {
            Ok(presentation) => result_fragment(&presentation),
            Err(e) => return ApiError::from(e).into_response(),
        };
        Response::html(render_page(&query, &fragment))
    }

    fn palette(&self, request: &Request) -> Result<(Query, Arc<Palette>), ApiError> {
        let query = self.parse_query(request)?;
        let credentials = self.lastfm.credentials()?;
        let palette = self.fetcher.fetch(&query, &credentials)?;
        Ok((query, palette))
    }

    fn palette_png(&self, request: &Request) -> Result<Response, ApiError> {
        let (_, palette) = self.palette(request)?;
        let strip = render::render_strip(&palette.colors())
            .ok_or_else(|| ApiError::NotFound(render::EMPTY_NOTICE.to_string()))?;
        Ok(Response::from_data("image/png", render::encode_png(&strip)?))
    }

    fn handle_palette_png(&self, request: &Request) -> Response {
        match self.palette_png(request) {
            Ok(r) => r,
            Err(e) => e.into_response(),
        }
    }

    fn handle_palette_json(&self, request: &Request) -> Response {
        match self.palette(request) {
            Ok((query, palette)) => Response::json(&PaletteResponse::from_domain(&query, &palette)),
            Err(e) => e.into_response(),
        }
    }
}

fn render_page(query: &Query, result: &str) -> String {
    let options = Period::ALL
        .iter()
        .map(|p| {
            let selected = if *p == query.period { " selected" } else { "" };
            format!(
                "          <option value=\"{}\"{selected}>{}</option>",
                p.api_name(),
                p.label()
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    fill_template(
        include_str!("../../html/index.html"),
        &[
            ("IDENTITY", &escape_html(&query.identity)),
            ("PERIOD_OPTIONS", &options),
            ("MIN_COUNT", &MIN_COUNT.to_string()),
            ("MAX_COUNT", &MAX_COUNT.to_string()),
            ("COUNT", &query.count().to_string()),
            ("RESULT", result),
        ],
    )
}

/// Replaces `{{NAME}}` placeholders in a single pass over the template,
/// so substituted text is never scanned for placeholders again.
fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let value = after.find("}}").and_then(|end| {
            let name = &after[..end];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, end))
        });
        match value {
            Some((value, end)) => {
                out.push_str(value);
                rest = &after[end + 2..];
            }
            None => {
                out.push_str("{{");
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn notice(class: &str, text: &str) -> String {
    format!("    <div class=\"{class}\">{}</div>", escape_html(text))
}

fn result_fragment(presentation: &Presentation) -> String {
    match presentation {
        Presentation::Failed(_) => notice("error", &presentation.message()),
        Presentation::Empty => notice("warning", &presentation.message()),
        Presentation::Strip { png, .. } => format!(
            "    <img class=\"strip\" alt=\"\" src=\"data:image/png;base64,{}\">\n{}",
            BASE64_STANDARD.encode(png),
            notice("success", &presentation.message())
        ),
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[derive(Serialize, Deserialize)]
struct PaletteResponse {
    user: String,
    period: String,
    count: u32,
    colors: Vec<String>,
    albums: Vec<AlbumResponse>,
    skipped: Vec<SkippedResponse>,
    message: String,
}

#[derive(Serialize, Deserialize)]
struct AlbumResponse {
    rank: u32,
    title: String,
    artist: String,
    hex: String,
}

#[derive(Serialize, Deserialize)]
struct SkippedResponse {
    rank: u32,
    title: String,
    artist: String,
    reason: String,
}

impl PaletteResponse {
    fn from_domain(query: &Query, palette: &Palette) -> Self {
        let message = if palette.is_empty() {
            render::EMPTY_NOTICE.to_string()
        } else {
            render::success_message(palette.len())
        };
        Self {
            user: query.identity.clone(),
            period: query.period.api_name().to_string(),
            count: query.count(),
            colors: palette.colors().iter().map(|c| c.hex()).collect(),
            albums: palette
                .samples
                .iter()
                .map(|s| AlbumResponse {
                    rank: s.rank,
                    title: s.title.clone(),
                    artist: s.artist.clone(),
                    hex: s.color.hex(),
                })
                .collect(),
            skipped: palette
                .skipped
                .iter()
                .map(|s| SkippedResponse {
                    rank: s.rank,
                    title: s.title.clone(),
                    artist: s.artist.clone(),
                    reason: s.reason.to_string(),
                })
                .collect(),
            message,
        }
    }
}

#[cfg(test)]
pub fn parse_json_response<T: serde::de::DeserializeOwned>(
    response: rouille::Response,
) -> anyhow::Result<T> {
    Ok(serde_json::from_reader(
        response.data.into_reader_and_size().0,
    )?)
}

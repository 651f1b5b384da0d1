// Copyright © 2024 TinySite. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Content Resolution Module
//!
//! Turns the `content/` directory into a flat [`ContentMap`] keyed by
//! route. Every top-level directory holds a `page.json` descriptor; its
//! `items` are expanded recursively and its `tabs` are registered as
//! sibling pages one level down.
//!
//! ## Inheritance
//!
//! A child in `items` takes, when it does not set them itself:
//!
//! - its template from the parent's `items_template`;
//! - its title from the parent's `items_title`, or its 1-based index;
//! - its route segment from the parent's `items_route`, or its index.
//!
//! `items_title`, `items_route` and a child's own `route` are format
//! patterns where `{loop_index}` expands to the child's index (see
//! [`format_loop_index`]).
//!
//! ## Ownership
//!
//! Entries live in an arena; the parent link is an [`EntryId`], so the
//! resolved tree never owns itself.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::core::error::{Result, SiteError};
use crate::core::traits::IntoContext;
use crate::process::read_json;

/// Name of the descriptor file inside every top-level content directory.
pub const PAGE_FILE: &str = "page.json";

/// Default pattern for titles and routes of `items`.
const DEFAULT_ITEMS_PATTERN: &str = "{loop_index}";

/// A page node as written in `page.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageDescriptor {
    /// Page title; required on root descriptors.
    #[serde(default)]
    pub title: Option<String>,
    /// Template name, relative to the templates directory.
    #[serde(default)]
    pub template: Option<String>,
    /// The page is part of the tree but gets no output file.
    #[serde(default)]
    pub no_render: bool,
    /// Route segment (a format pattern) when used as an item.
    #[serde(default)]
    pub route: Option<String>,
    /// Child pages.
    #[serde(default)]
    pub items: Vec<PageDescriptor>,
    /// Default template for `items`.
    #[serde(default)]
    pub items_template: Option<String>,
    /// Default title pattern for `items`.
    #[serde(default)]
    pub items_title: Option<String>,
    /// Default route pattern for `items`.
    #[serde(default)]
    pub items_route: Option<String>,
    /// Tab pages registered one level below this page.
    #[serde(default)]
    pub tabs: Vec<TabDescriptor>,
    /// Template used by every tab.
    #[serde(default)]
    pub tabs_template: Option<String>,
    /// Inline page data; wins over `data_json` key by key.
    #[serde(default)]
    pub data: Option<JsonValue>,
    /// File under `content/<route_origin>/data/` merged into `data`.
    #[serde(default)]
    pub data_json: Option<String>,
    /// Route that links to this page are redirected to.
    #[serde(default)]
    pub forward: Option<String>,
    /// Additional path this page is rendered at.
    #[serde(default)]
    pub pulled: Option<String>,
    /// The page owns an `assets/` upload directory.
    #[serde(default)]
    pub assets: bool,
    /// Every other key, passed to templates untouched.
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

/// A tab as written in a descriptor's `tabs` list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TabDescriptor {
    /// Route segment below the owning page.
    #[serde(default)]
    pub route: Option<String>,
    /// Tab title.
    #[serde(default)]
    pub title: Option<String>,
    /// The tab is listed but gets no output file.
    #[serde(default)]
    pub no_render: bool,
    /// Route that links to this tab are redirected to.
    #[serde(default)]
    pub forward: Option<String>,
    /// Additional path this tab is rendered at.
    #[serde(default)]
    pub pulled: Option<String>,
    /// Every other key, passed to templates untouched.
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

/// Index of an entry inside a [`ContentMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryId(usize);

/// Whether an entry came from `items`/a root or from `tabs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// A root descriptor or an item.
    Page,
    /// A tab of its parent page.
    Tab,
}

/// A descriptor after inheritance and defaulting.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEntry {
    /// Full route, e.g. `shop/2/details`.
    pub route: String,
    /// Effective title.
    pub title: Option<String>,
    /// Effective template.
    pub template: Option<String>,
    /// Excluded from rendering.
    pub no_render: bool,
    /// Name of the top-level content directory the entry comes from.
    pub route_origin: String,
    /// 1-based position among its siblings, for items.
    pub loop_index: Option<usize>,
    /// Page or tab.
    pub kind: EntryKind,
    /// The enclosing page.
    pub parent: Option<EntryId>,
    /// Resolved items, in descriptor order.
    pub children: Vec<EntryId>,
    /// Resolved tabs, in descriptor order.
    pub tabs: Vec<EntryId>,
    /// Redirect target for links to this entry.
    pub forward: Option<String>,
    /// Alias path this entry is also rendered at.
    pub pulled: Option<String>,
    /// The entry owns an upload directory.
    pub assets: bool,
    /// Page data after merging `data_json`.
    pub data: Option<JsonValue>,
    /// Remaining descriptor keys.
    pub fields: Map<String, JsonValue>,
}

impl ResolvedEntry {
    /// `true` when the renderer should write this entry.
    pub fn is_renderable(&self) -> bool {
        !self.no_render && self.template.is_some()
    }
}

/// Flat mapping from route to resolved entry, in resolution order.
#[derive(Debug, Clone, Default)]
pub struct ContentMap {
    entries: Vec<ResolvedEntry>,
    routes: HashMap<String, EntryId>,
}

impl ContentMap {
    /// Number of resolved entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when nothing was resolved.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up an entry by route.
    pub fn get(&self, route: &str) -> Option<&ResolvedEntry> {
        self.id_of(route).map(|id| self.entry(id))
    }

    /// Looks up the id of a route.
    pub fn id_of(&self, route: &str) -> Option<EntryId> {
        self.routes.get(route).copied()
    }

    /// Returns `true` if the route is known.
    pub fn contains(&self, route: &str) -> bool {
        self.routes.contains_key(route)
    }

    /// The entry behind an id handed out by this map.
    pub fn entry(&self, id: EntryId) -> &ResolvedEntry {
        &self.entries[id.0]
    }

    /// The parent of an entry, if any.
    pub fn parent(&self, entry: &ResolvedEntry) -> Option<&ResolvedEntry> {
        entry.parent.map(|id| self.entry(id))
    }

    /// All entries with their ids, in resolution order.
    pub fn iter(&self) -> impl Iterator<Item = (EntryId, &ResolvedEntry)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, entry)| (EntryId(index), entry))
    }

    /// All routes, in resolution order.
    pub fn routes(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.route.as_str())
    }

    /// Entries the renderer writes.
    pub fn renderable(&self) -> impl Iterator<Item = (EntryId, &ResolvedEntry)> {
        self.iter().filter(|(_, entry)| entry.is_renderable())
    }

    /// Titles from the entry up to its root, leaf first.
    pub fn title_chain(&self, id: EntryId) -> Vec<&str> {
        let mut titles = Vec::new();
        let mut current = Some(self.entry(id));
        while let Some(entry) = current {
            if let Some(title) = &entry.title {
                titles.push(title.as_str());
            }
            current = self.parent(entry);
        }
        titles
    }

    /// The JSON `page` object templates see for an entry.
    pub fn page_view(&self, id: EntryId) -> PageView<'_> {
        PageView { map: self, id }
    }

    fn shallow_context(&self, id: EntryId) -> Map<String, JsonValue> {
        let entry = self.entry(id);
        let mut context = entry.fields.clone();
        let mut set = |key: &str, value: JsonValue| {
            _ = context.insert(key.to_string(), value);
        };
        set("route", JsonValue::String(entry.route.clone()));
        set("route_origin", JsonValue::String(entry.route_origin.clone()));
        set("no_render", JsonValue::Bool(entry.no_render));
        set("assets", JsonValue::Bool(entry.assets));
        if let Some(title) = &entry.title {
            set("title", JsonValue::String(title.clone()));
        }
        if let Some(template) = &entry.template {
            set("template", JsonValue::String(template.clone()));
        }
        if let Some(loop_index) = entry.loop_index {
            set("loop_index", JsonValue::from(loop_index));
        }
        if let Some(data) = &entry.data {
            set("data", data.clone());
        }
        if let Some(forward) = &entry.forward {
            set("forward", JsonValue::String(forward.clone()));
        }
        if let Some(pulled) = &entry.pulled {
            set("pulled", JsonValue::String(pulled.clone()));
        }
        context
    }

    fn ancestor_context(&self, id: EntryId) -> JsonValue {
        let entry = self.entry(id);
        let mut context = self.shallow_context(id);
        let siblings = |ids: &[EntryId]| {
            ids.iter()
                .map(|&sibling| JsonValue::Object(self.shallow_context(sibling)))
                .collect::<Vec<_>>()
        };
        _ = context.insert("items".to_string(), JsonValue::Array(siblings(&entry.children)));
        _ = context.insert("tabs".to_string(), JsonValue::Array(siblings(&entry.tabs)));
        if let Some(parent) = entry.parent {
            _ = context.insert("parent".to_string(), self.ancestor_context(parent));
        }
        JsonValue::Object(context)
    }

    fn full_context(&self, id: EntryId) -> JsonValue {
        let entry = self.entry(id);
        let mut context = self.shallow_context(id);
        let items = entry
            .children
            .iter()
            .map(|&child| self.full_context(child))
            .collect();
        let tabs = entry
            .tabs
            .iter()
            .map(|&tab| JsonValue::Object(self.shallow_context(tab)))
            .collect();
        _ = context.insert("items".to_string(), JsonValue::Array(items));
        _ = context.insert("tabs".to_string(), JsonValue::Array(tabs));
        if let Some(parent) = entry.parent {
            _ = context.insert("parent".to_string(), self.ancestor_context(parent));
        }
        JsonValue::Object(context)
    }

    fn register(&mut self, entry: ResolvedEntry) -> Result<EntryId> {
        if self.routes.contains_key(&entry.route) {
            return Err(SiteError::validation(
                "route is defined more than once",
                Some(&entry.route),
            ));
        }
        let id = EntryId(self.entries.len());
        _ = self.routes.insert(entry.route.clone(), id);
        self.entries.push(entry);
        Ok(id)
    }
}

/// One entry rendered as a template `page` object: the entry's own keys,
/// its items (recursively), its tabs and its ancestor chain. Each ancestor
/// also lists its own items and tabs, one level deep.
#[derive(Debug, Clone, Copy)]
pub struct PageView<'a> {
    map: &'a ContentMap,
    id: EntryId,
}

impl IntoContext for PageView<'_> {
    fn into_context(self) -> JsonValue {
        self.map.full_context(self.id)
    }
}

/// Resolves every descriptor tree below `content_dir`.
pub fn resolve<P: AsRef<Path>>(content_dir: P) -> Result<ContentMap> {
    let content_dir = content_dir.as_ref();
    let entries = fs::read_dir(content_dir)
        .map_err(|e| SiteError::io_error(content_dir.to_path_buf(), e))?;

    let mut origins = Vec::new();
    for entry in entries {
        let entry =
            entry.map_err(|e| SiteError::io_error(content_dir.to_path_buf(), e))?;
        if entry.path().is_dir() {
            origins.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    origins.sort();

    let mut resolver = Resolver::new(content_dir);
    for origin in origins {
        let page: PageDescriptor =
            read_json(content_dir.join(&origin).join(PAGE_FILE))?;
        resolver.resolve_root(page, &origin)?;
    }
    Ok(resolver.finish())
}

/// Resolves descriptor trees that are already in memory.
///
/// `content_dir` is only consulted for `data_json` files.
#[derive(Debug)]
pub struct Resolver {
    content_dir: PathBuf,
    map: ContentMap,
}

impl Resolver {
    /// Creates a resolver reading data files below `content_dir`.
    pub fn new<P: AsRef<Path>>(content_dir: P) -> Self {
        Self {
            content_dir: content_dir.as_ref().to_path_buf(),
            map: ContentMap::default(),
        }
    }

    /// Resolves one root descriptor found in directory `origin`.
    pub fn resolve_root(&mut self, page: PageDescriptor, origin: &str) -> Result<EntryId> {
        if page.title.is_none() {
            return Err(SiteError::validation(
                "root pages need a title",
                Some(origin),
            ));
        }
        self.collect(page, origin.to_string(), origin, None, None)
    }

    /// Returns the resolved map.
    pub fn finish(self) -> ContentMap {
        self.map
    }

    fn collect(
        &mut self,
        mut page: PageDescriptor,
        route: String,
        origin: &str,
        parent: Option<EntryId>,
        loop_index: Option<usize>,
    ) -> Result<EntryId> {
        if page.template.is_none() && !page.no_render {
            return Err(SiteError::validation(
                "page needs a template or the no_render flag",
                Some(&route),
            ));
        }
        debug!("collect content for route: {}", route);

        if let Some(file) = &page.data_json {
            page.data = Some(self.load_data(origin, file, page.data.take())?);
        }

        let items = std::mem::take(&mut page.items);
        let tabs = std::mem::take(&mut page.tabs);
        let id = self.map.register(ResolvedEntry {
            route: route.clone(),
            title: page.title,
            template: page.template,
            no_render: page.no_render,
            route_origin: origin.to_string(),
            loop_index,
            kind: EntryKind::Page,
            parent,
            children: Vec::new(),
            tabs: Vec::new(),
            forward: page.forward,
            pulled: page.pulled,
            assets: page.assets,
            data: page.data,
            fields: page.extra,
        })?;

        if !tabs.is_empty() {
            let template = page.tabs_template.clone().ok_or_else(|| {
                SiteError::validation(
                    "page with tabs needs a tabs_template",
                    Some(&route),
                )
            })?;
            for tab in tabs {
                let segment = tab.route.ok_or_else(|| {
                    SiteError::validation("tab needs a route", Some(&route))
                })?;
                let tab_route = join_route(&route, &segment)?;
                debug!("collect tab for route: {}", tab_route);
                let tab_id = self.map.register(ResolvedEntry {
                    route: tab_route,
                    title: tab.title,
                    template: Some(template.clone()),
                    no_render: tab.no_render,
                    route_origin: origin.to_string(),
                    loop_index: None,
                    kind: EntryKind::Tab,
                    parent: Some(id),
                    children: Vec::new(),
                    tabs: Vec::new(),
                    forward: tab.forward,
                    pulled: tab.pulled,
                    assets: false,
                    data: None,
                    fields: tab.extra,
                })?;
                self.map.entries[id.0].tabs.push(tab_id);
            }
        }

        for (index, mut item) in items.into_iter().enumerate() {
            let loop_index = index + 1;

            if !item.no_render && item.template.is_none() {
                item.template = Some(page.items_template.clone().ok_or_else(|| {
                    SiteError::validation(
                        format!(
                            "item {} needs a template or its parent needs an items_template",
                            loop_index
                        ),
                        Some(&route),
                    )
                })?);
            }

            if item.title.is_none() {
                let pattern = page
                    .items_title
                    .as_deref()
                    .unwrap_or(DEFAULT_ITEMS_PATTERN);
                item.title = Some(format_loop_index(pattern, loop_index, &route)?);
            }

            let pattern = item
                .route
                .as_deref()
                .or(page.items_route.as_deref())
                .unwrap_or(DEFAULT_ITEMS_PATTERN);
            let segment = format_loop_index(pattern, loop_index, &route)?;
            let item_route = join_route(&route, &segment)?;

            let child = self.collect(item, item_route, origin, Some(id), Some(loop_index))?;
            self.map.entries[id.0].children.push(child);
        }

        Ok(id)
    }

    fn load_data(
        &self,
        origin: &str,
        file: &str,
        inline: Option<JsonValue>,
    ) -> Result<JsonValue> {
        let path = self.content_dir.join(origin).join("data").join(file);
        let loaded: JsonValue = read_json(&path)?;
        Ok(match (loaded, inline) {
            (JsonValue::Object(mut base), Some(JsonValue::Object(inline))) => {
                for (key, value) in inline {
                    _ = base.insert(key, value);
                }
                JsonValue::Object(base)
            }
            (_, Some(inline)) => inline,
            (loaded, None) => loaded,
        })
    }
}

/// Joins a child segment onto a parent route with a single `/`.
pub fn join_route(parent: &str, segment: &str) -> Result<String> {
    let segment = segment.trim_matches('/');
    if segment.is_empty() {
        return Err(SiteError::validation(
            "route segment must not be empty",
            Some(parent),
        ));
    }
    Ok(format!("{}/{}", parent.trim_end_matches('/'), segment))
}

/// Expands `{loop_index}` placeholders in `pattern`.
///
/// Supports a width with optional zero padding and `d` type
/// (`{loop_index:03d}`), and `{{`/`}}` escapes. `route` only serves the
/// error message.
pub fn format_loop_index(pattern: &str, loop_index: usize, route: &str) -> Result<String> {
    let invalid = |reason: &str| {
        SiteError::validation(
            format!("invalid format pattern `{}`: {}", pattern, reason),
            Some(route),
        )
    };

    let mut output = String::with_capacity(pattern.len());
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                _ = chars.next();
                output.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                _ = chars.next();
                output.push('}');
            }
            '}' => return Err(invalid("single `}`")),
            '{' => {
                let mut field = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(c) => field.push(c),
                        None => return Err(invalid("unclosed `{`")),
                    }
                }
                let (name, spec) = match field.split_once(':') {
                    Some((name, spec)) => (name, Some(spec)),
                    None => (field.as_str(), None),
                };
                if name != "loop_index" {
                    return Err(invalid(&format!("unknown field `{}`", name)));
                }
                output.push_str(&apply_format_spec(loop_index, spec).ok_or_else(|| {
                    invalid(&format!("unsupported format spec `{}`", spec.unwrap_or("")))
                })?);
            }
            c => output.push(c),
        }
    }
    Ok(output)
}

fn apply_format_spec(value: usize, spec: Option<&str>) -> Option<String> {
    let spec = match spec {
        None | Some("") => return Some(value.to_string()),
        Some(spec) => spec.strip_suffix('d').unwrap_or(spec),
    };
    if spec.is_empty() {
        return Some(value.to_string());
    }
    let (zero_pad, width) = match spec.strip_prefix('0') {
        Some(rest) if !rest.is_empty() => (true, rest),
        _ => (false, spec),
    };
    let width: usize = width.parse().ok()?;
    Some(if zero_pad {
        format!("{:0width$}", value, width = width)
    } else {
        format!("{:>width$}", value, width = width)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn descriptor(value: JsonValue) -> PageDescriptor {
        serde_json::from_value(value).unwrap()
    }

    fn resolve_one(value: JsonValue) -> Result<ContentMap> {
        let mut resolver = Resolver::new("unused");
        _ = resolver.resolve_root(descriptor(value), "shop")?;
        Ok(resolver.finish())
    }

    #[test]
    fn test_items_inherit_template_title_and_route() {
        let map = resolve_one(json!({
            "title": "Shop",
            "template": "list.html",
            "items_template": "child.html",
            "items_route": "{loop_index}",
            "items": [{}, {}, {}]
        }))
        .unwrap();

        for index in 1..=3 {
            let route = format!("shop/{}", index);
            let entry = map.get(&route).unwrap();
            assert_eq!(entry.title.as_deref(), Some(index.to_string().as_str()));
            assert_eq!(entry.template.as_deref(), Some("child.html"));
            assert_eq!(entry.loop_index, Some(index));
            assert_eq!(entry.route_origin, "shop");
        }
        let root = map.get("shop").unwrap();
        assert_eq!(root.children.len(), 3);
    }

    #[test]
    fn test_item_patterns_and_own_values() {
        let map = resolve_one(json!({
            "title": "Gallery",
            "template": "gallery.html",
            "items_template": "photo.html",
            "items_title": "Photo {loop_index}",
            "items_route": "photo-{loop_index:02d}",
            "items": [
                {},
                {"title": "Cover {literal}", "route": "cover"},
                {"template": "special.html", "route": "p{loop_index}"}
            ]
        }))
        .unwrap();

        let first = map.get("shop/photo-01").unwrap();
        assert_eq!(first.title.as_deref(), Some("Photo 1"));
        let cover = map.get("shop/cover").unwrap();
        assert_eq!(cover.title.as_deref(), Some("Cover {literal}"));
        let third = map.get("shop/p3").unwrap();
        assert_eq!(third.template.as_deref(), Some("special.html"));
        assert_eq!(third.title.as_deref(), Some("Photo 3"));
    }

    #[test]
    fn test_routes_join_ancestor_segments_once() {
        let map = resolve_one(json!({
            "title": "Shop",
            "template": "a.html",
            "items_template": "b.html",
            "items": [
                {"route": "x", "items_template": "c.html", "items": [{}, {"route": "y"}]},
                {"items_route": "n{loop_index}", "items_template": "c.html", "items": [{}]}
            ]
        }))
        .unwrap();

        let routes: Vec<&str> = map.routes().collect();
        assert_eq!(
            routes,
            vec!["shop", "shop/x", "shop/x/1", "shop/x/y", "shop/2", "shop/2/n1"]
        );
        for (_, entry) in map.iter() {
            if let Some(parent) = map.parent(entry) {
                let segment = entry.route.strip_prefix(&format!("{}/", parent.route)).unwrap();
                assert!(!segment.is_empty());
                assert!(!segment.contains('/'));
            }
        }
    }

    #[test]
    fn test_missing_template_is_validation_error() {
        let err = resolve_one(json!({"title": "Shop"})).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("shop"));
    }

    #[test]
    fn test_no_render_is_resolved_but_not_renderable() {
        let map = resolve_one(json!({"title": "Shop", "no_render": true})).unwrap();
        let entry = map.get("shop").unwrap();
        assert!(!entry.is_renderable());
        assert_eq!(map.renderable().count(), 0);
    }

    #[test]
    fn test_item_without_template_needs_items_template() {
        let err = resolve_one(json!({
            "title": "Shop",
            "template": "a.html",
            "items": [{"title": "x"}]
        }))
        .unwrap_err();
        assert!(err.is_validation());

        let map = resolve_one(json!({
            "title": "Shop",
            "template": "a.html",
            "items": [{"title": "x", "no_render": true}]
        }))
        .unwrap();
        assert!(map.get("shop/1").unwrap().template.is_none());
    }

    #[test]
    fn test_root_needs_title() {
        let err = resolve_one(json!({"template": "a.html"})).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_duplicate_routes_rejected() {
        let err = resolve_one(json!({
            "title": "Shop",
            "template": "a.html",
            "items_template": "b.html",
            "items": [{"route": "same"}, {"route": "same"}]
        }))
        .unwrap_err();
        assert!(err.to_string().contains("shop/same"));
    }

    #[test]
    fn test_tabs_registered_with_parent_link() {
        let map = resolve_one(json!({
            "title": "Shop",
            "template": "a.html",
            "tabs_template": "tab.html",
            "tabs": [{"route": "info", "title": "Info", "icon": "i"}]
        }))
        .unwrap();

        let tab = map.get("shop/info").unwrap();
        assert_eq!(tab.kind, EntryKind::Tab);
        assert_eq!(tab.template.as_deref(), Some("tab.html"));
        assert_eq!(map.parent(tab).unwrap().route, "shop");
        assert_eq!(tab.fields["icon"], json!("i"));

        let err = resolve_one(json!({
            "title": "Shop",
            "template": "a.html",
            "tabs": [{"route": "info"}]
        }))
        .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_title_chain() {
        let map = resolve_one(json!({
            "title": "A",
            "template": "a.html",
            "items": [{"title": "B", "template": "b.html", "items": [
                {"title": "C", "template": "c.html"}
            ]}]
        }))
        .unwrap();

        let id = map.id_of("shop/1/1").unwrap();
        assert_eq!(map.title_chain(id), vec!["C", "B", "A"]);
    }

    #[test]
    fn test_page_view_context() {
        let map = resolve_one(json!({
            "title": "Shop",
            "template": "a.html",
            "items_template": "b.html",
            "intro": "Welcome",
            "items": [{"price": 3}]
        }))
        .unwrap();

        let root = map.page_view(map.id_of("shop").unwrap()).into_context();
        assert_eq!(root["intro"], json!("Welcome"));
        assert_eq!(root["items"][0]["route"], json!("shop/1"));
        assert_eq!(root["items"][0]["price"], json!(3));

        let child = map.page_view(map.id_of("shop/1").unwrap()).into_context();
        assert_eq!(child["parent"]["title"], json!("Shop"));
        assert_eq!(child["loop_index"], json!(1));
    }

    #[test]
    fn test_parent_lists_sibling_items_and_tabs() {
        let map = resolve_one(json!({
            "title": "Shop",
            "template": "a.html",
            "items_template": "b.html",
            "tabs_template": "tab.html",
            "tabs": [
                {"route": "info", "title": "Info"},
                {"route": "contact", "title": "Contact"}
            ],
            "items": [
                {"title": "One", "items": [{"title": "Deep"}], "items_template": "c.html"},
                {"title": "Two"}
            ]
        }))
        .unwrap();

        let tab = map.page_view(map.id_of("shop/info").unwrap()).into_context();
        let tabs = tab["parent"]["tabs"].as_array().unwrap();
        assert_eq!(tabs.len(), 2);
        assert_eq!(tabs[1]["route"], json!("shop/contact"));
        assert_eq!(tabs[1]["title"], json!("Contact"));

        let item = map.page_view(map.id_of("shop/2").unwrap()).into_context();
        let items = item["parent"]["items"].as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["title"], json!("One"));
        assert_eq!(items[1]["route"], json!("shop/2"));
        assert!(items[0].get("items").is_none());
        assert_eq!(item["parent"]["tabs"].as_array().unwrap().len(), 2);

        let deep = map.page_view(map.id_of("shop/1/1").unwrap()).into_context();
        assert_eq!(deep["parent"]["items"][0]["title"], json!("Deep"));
        assert_eq!(deep["parent"]["parent"]["items"][1]["title"], json!("Two"));
    }

    #[test]
    fn test_tab_flags_are_honoured() {
        let map = resolve_one(json!({
            "title": "Shop",
            "template": "a.html",
            "tabs_template": "tab.html",
            "tabs": [
                {"route": "hidden", "no_render": true, "forward": "shop/info"},
                {"route": "info", "pulled": "info"}
            ]
        }))
        .unwrap();

        let hidden = map.get("shop/hidden").unwrap();
        assert!(hidden.no_render);
        assert!(!hidden.is_renderable());
        assert_eq!(hidden.forward.as_deref(), Some("shop/info"));
        assert!(!hidden.fields.contains_key("no_render"));

        let info = map.get("shop/info").unwrap();
        assert_eq!(info.pulled.as_deref(), Some("info"));

        let rendered: Vec<&str> =
            map.renderable().map(|(_, entry)| entry.route.as_str()).collect();
        assert_eq!(rendered, vec!["shop", "shop/info"]);
    }

    #[test]
    fn test_resolve_directory_with_data_json() {
        let dir = TempDir::new().unwrap();
        let origin = dir.path().join("about");
        fs::create_dir_all(origin.join("data")).unwrap();
        fs::write(
            origin.join(PAGE_FILE),
            json!({
                "title": "About",
                "template": "about.html",
                "data_json": "team.json",
                "data": {"city": "Berlin"}
            })
            .to_string(),
        )
        .unwrap();
        fs::write(
            origin.join("data/team.json"),
            json!({"city": "Hamburg", "size": 4}).to_string(),
        )
        .unwrap();
        fs::write(dir.path().join("README.txt"), "not a page").unwrap();

        let map = resolve(dir.path()).unwrap();
        assert_eq!(map.len(), 1);
        let data = map.get("about").unwrap().data.clone().unwrap();
        assert_eq!(data, json!({"city": "Berlin", "size": 4}));
    }

    #[test]
    fn test_missing_data_json_fails() {
        let dir = TempDir::new().unwrap();
        let origin = dir.path().join("about");
        fs::create_dir_all(&origin).unwrap();
        fs::write(
            origin.join(PAGE_FILE),
            json!({"title": "About", "template": "a.html", "data_json": "nope.json"})
                .to_string(),
        )
        .unwrap();

        assert!(matches!(resolve(dir.path()), Err(SiteError::IOError { .. })));
    }

    #[test]
    fn test_format_loop_index() {
        assert_eq!(format_loop_index("{loop_index}", 7, "r").unwrap(), "7");
        assert_eq!(format_loop_index("p{loop_index:03}", 7, "r").unwrap(), "p007");
        assert_eq!(format_loop_index("{loop_index:3d}", 7, "r").unwrap(), "  7");
        assert_eq!(format_loop_index("{{x}}-{loop_index}", 2, "r").unwrap(), "{x}-2");
        assert!(format_loop_index("{index}", 1, "r").is_err());
        assert!(format_loop_index("{loop_index", 1, "r").is_err());
        assert!(format_loop_index("a}b", 1, "r").is_err());
        assert!(format_loop_index("{loop_index:x}", 1, "r").is_err());
    }

    #[test]
    fn test_join_route() {
        assert_eq!(join_route("shop", "1").unwrap(), "shop/1");
        assert_eq!(join_route("shop/", "/1").unwrap(), "shop/1");
        assert!(join_route("shop", "").is_err());
    }
}

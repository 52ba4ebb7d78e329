//! Core type definitions for the node map
//!
//! `NodeType` is a closed enumeration. Everything the layout and render paths
//! need to know about a type lives in its [`TypeInfo`] row, so those paths
//! switch on the tag instead of inspecting nodes at runtime.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Icon drawn for a node when it is too small to show its frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Icon {
    Root,
    Folder,
    Package,
    Namespace,
    Class,
    Method,
    Field,
    External,
}

impl Icon {
    /// Single glyph used inside the tile markup
    pub fn glyph(&self) -> char {
        match self {
            Icon::Root => '◎',
            Icon::Folder => '▤',
            Icon::Package => '▣',
            Icon::Namespace => '◇',
            Icon::Class => '◆',
            Icon::Method => '●',
            Icon::Field => '○',
            Icon::External => '◌',
        }
    }

    /// CSS class name used inside the tile markup
    pub fn class_name(&self) -> &'static str {
        match self {
            Icon::Root => "icon-root",
            Icon::Folder => "icon-folder",
            Icon::Package => "icon-package",
            Icon::Namespace => "icon-namespace",
            Icon::Class => "icon-class",
            Icon::Method => "icon-method",
            Icon::Field => "icon-field",
            Icon::External => "icon-external",
        }
    }
}

/// Static data associated with each [`NodeType`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TypeInfo {
    pub icon: Icon,
    /// Member-like nodes use the small member grid metric
    pub is_member: bool,
    /// Private members go to the second lane of a type-with-members layout
    pub is_private: bool,
    /// Type-like containers switch to the three-lane layout when they have members
    pub is_type: bool,
    /// Default fill color for the node frame
    pub color: &'static str,
}

/// Kind of node in the containment tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NodeType {
    /// The single root of the tree
    Root,
    /// Generic container (folder, solution)
    #[default]
    Group,
    /// Assembly or crate-like container
    Assembly,
    /// Namespace or module
    Namespace,
    /// Type-like node (class, struct, interface)
    Type,
    /// Public member (method, field)
    Member,
    /// Non-public member
    PrivateMember,
    /// Node referenced from outside the analysed source
    External,
}

impl NodeType {
    /// Look up the data row for this type
    pub fn info(&self) -> TypeInfo {
        match self {
            NodeType::Root => TypeInfo {
                icon: Icon::Root,
                is_member: false,
                is_private: false,
                is_type: false,
                color: "#ffffff",
            },
            NodeType::Group => TypeInfo {
                icon: Icon::Folder,
                is_member: false,
                is_private: false,
                is_type: false,
                color: "#eef2f7",
            },
            NodeType::Assembly => TypeInfo {
                icon: Icon::Package,
                is_member: false,
                is_private: false,
                is_type: false,
                color: "#dde8f3",
            },
            NodeType::Namespace => TypeInfo {
                icon: Icon::Namespace,
                is_member: false,
                is_private: false,
                is_type: false,
                color: "#e4efe4",
            },
            NodeType::Type => TypeInfo {
                icon: Icon::Class,
                is_member: false,
                is_private: false,
                is_type: true,
                color: "#f6ecd9",
            },
            NodeType::Member => TypeInfo {
                icon: Icon::Method,
                is_member: true,
                is_private: false,
                is_type: false,
                color: "#fbf7ee",
            },
            NodeType::PrivateMember => TypeInfo {
                icon: Icon::Field,
                is_member: true,
                is_private: true,
                is_type: false,
                color: "#f4f0e8",
            },
            NodeType::External => TypeInfo {
                icon: Icon::External,
                is_member: false,
                is_private: false,
                is_type: false,
                color: "#eeeeee",
            },
        }
    }

    /// Returns true for member-like nodes
    pub fn is_member(&self) -> bool {
        self.info().is_member
    }

    /// Returns true for type-like containers
    pub fn is_type(&self) -> bool {
        self.info().is_type
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeType::Root => write!(f, "root"),
            NodeType::Group => write!(f, "group"),
            NodeType::Assembly => write!(f, "assembly"),
            NodeType::Namespace => write!(f, "namespace"),
            NodeType::Type => write!(f, "type"),
            NodeType::Member => write!(f, "member"),
            NodeType::PrivateMember => write!(f, "private-member"),
            NodeType::External => write!(f, "external"),
        }
    }
}

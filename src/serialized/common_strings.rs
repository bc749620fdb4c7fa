//! Builtin string buffer shared by every blob-encoded type tree.
//!
//! Type-tree string offsets with the high bit set index this buffer instead
//! of the tree's own string table.  The buffer is the NUL-separated
//! concatenation below; an offset addresses the first byte of an entry.

const COMMON_STRINGS: &str = concat!(
    "AABB\0AnimationClip\0AnimationCurve\0AnimationState\0Array\0Base\0BitField\0bitset\0",
    "bool\0char\0ColorRGBA\0Component\0data\0deque\0double\0dynamic_array\0",
    "FastPropertyName\0first\0float\0Font\0GameObject\0Generic Mono\0GradientNEW\0GUID\0",
    "GUIStyle\0int\0list\0long long\0map\0Matrix4x4f\0MdFour\0MonoBehaviour\0MonoScript\0",
    "m_ByteSize\0m_Curve\0m_EditorClassIdentifier\0m_EditorHideFlags\0m_Enabled\0",
    "m_ExtensionPtr\0m_GameObject\0m_Index\0m_IsArray\0m_IsStatic\0m_MetaFlag\0m_Name\0",
    "m_ObjectHideFlags\0m_PrefabInternal\0m_PrefabParentObject\0m_Script\0",
    "m_StaticEditorFlags\0m_Type\0m_Version\0Object\0pair\0PPtr<Component>\0",
    "PPtr<GameObject>\0PPtr<Material>\0PPtr<MonoBehaviour>\0PPtr<MonoScript>\0PPtr<Object>\0",
    "PPtr<Prefab>\0PPtr<Sprite>\0PPtr<TextAsset>\0PPtr<Texture>\0PPtr<Texture2D>\0",
    "PPtr<Transform>\0Prefab\0Quaternionf\0Rectf\0RectInt\0RectOffset\0second\0set\0short\0",
    "size\0SInt16\0SInt32\0SInt64\0SInt8\0staticvector\0string\0TextAsset\0TextMesh\0",
    "Texture\0Texture2D\0Transform\0TypelessData\0UInt16\0UInt32\0UInt64\0UInt8\0",
    "unsigned int\0unsigned long long\0unsigned short\0vector\0Vector2f\0Vector3f\0",
    "Vector4f\0m_ScriptingClassIdentifier\0Gradient\0Type*\0int2_storage\0int3_storage\0",
    "BoundsInt\0m_CorrespondingSourceObject\0m_PrefabInstance\0m_PrefabAsset\0FileSize\0",
    "Hash128\0",
);

/// Entry starting at `offset`, if `offset` is the start of one.
pub fn lookup(offset: u32) -> Option<&'static str> {
    let bytes = COMMON_STRINGS.as_bytes();
    let start = offset as usize;
    if start >= bytes.len() || (start > 0 && bytes[start - 1] != 0) {
        return None;
    }
    let len = bytes[start..].iter().position(|&b| b == 0)?;
    COMMON_STRINGS.get(start..start + len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_offsets() {
        assert_eq!(lookup(0), Some("AABB"));
        assert_eq!(lookup(5), Some("AnimationClip"));
        assert_eq!(lookup(49), Some("Array"));
        assert_eq!(lookup(222), Some("int"));
        assert_eq!(lookup(427), Some("m_Name"));
        assert_eq!(lookup(840), Some("string"));
        assert_eq!(lookup(1161), Some("Hash128"));
    }

    #[test]
    fn mid_entry_offset_is_none() {
        assert_eq!(lookup(1), None);
        assert_eq!(lookup(100_000), None);
    }
}

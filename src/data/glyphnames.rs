//! Latin glyph names used by `Differences` arrays, sorted by name.

pub(crate) static GLYPH_NAMES: &[(&str, u16)] = &[
    ("A", 0x0041),
    ("AE", 0x00c6),
    ("Aacute", 0x00c1),
    ("Acircumflex", 0x00c2),
    ("Adieresis", 0x00c4),
    ("Agrave", 0x00c0),
    ("Aring", 0x00c5),
    ("Atilde", 0x00c3),
    ("B", 0x0042),
    ("C", 0x0043),
    ("Ccedilla", 0x00c7),
    ("D", 0x0044),
    ("E", 0x0045),
    ("Eacute", 0x00c9),
    ("Ecircumflex", 0x00ca),
    ("Edieresis", 0x00cb),
    ("Egrave", 0x00c8),
    ("Eth", 0x00d0),
    ("Euro", 0x20ac),
    ("F", 0x0046),
    ("G", 0x0047),
    ("H", 0x0048),
    ("I", 0x0049),
    ("Iacute", 0x00cd),
    ("Icircumflex", 0x00ce),
    ("Idieresis", 0x00cf),
    ("Igrave", 0x00cc),
    ("J", 0x004a),
    ("K", 0x004b),
    ("L", 0x004c),
    ("Lslash", 0x0141),
    ("M", 0x004d),
    ("N", 0x004e),
    ("Ntilde", 0x00d1),
    ("O", 0x004f),
    ("OE", 0x0152),
    ("Oacute", 0x00d3),
    ("Ocircumflex", 0x00d4),
    ("Odieresis", 0x00d6),
    ("Ograve", 0x00d2),
    ("Oslash", 0x00d8),
    ("Otilde", 0x00d5),
    ("P", 0x0050),
    ("Q", 0x0051),
    ("R", 0x0052),
    ("S", 0x0053),
    ("Scaron", 0x0160),
    ("T", 0x0054),
    ("Thorn", 0x00de),
    ("U", 0x0055),
    ("Uacute", 0x00da),
    ("Ucircumflex", 0x00db),
    ("Udieresis", 0x00dc),
    ("Ugrave", 0x00d9),
    ("V", 0x0056),
    ("W", 0x0057),
    ("X", 0x0058),
    ("Y", 0x0059),
    ("Yacute", 0x00dd),
    ("Ydieresis", 0x0178),
    ("Z", 0x005a),
    ("Zcaron", 0x017d),
    ("a", 0x0061),
    ("aacute", 0x00e1),
    ("acircumflex", 0x00e2),
    ("acute", 0x00b4),
    ("adieresis", 0x00e4),
    ("ae", 0x00e6),
    ("agrave", 0x00e0),
    ("ampersand", 0x0026),
    ("aring", 0x00e5),
    ("asciicircum", 0x005e),
    ("asciitilde", 0x007e),
    ("asterisk", 0x002a),
    ("at", 0x0040),
    ("atilde", 0x00e3),
    ("b", 0x0062),
    ("backslash", 0x005c),
    ("bar", 0x007c),
    ("braceleft", 0x007b),
    ("braceright", 0x007d),
    ("bracketleft", 0x005b),
    ("bracketright", 0x005d),
    ("breve", 0x02d8),
    ("brokenbar", 0x00a6),
    ("bullet", 0x2022),
    ("c", 0x0063),
    ("caron", 0x02c7),
    ("ccedilla", 0x00e7),
    ("cedilla", 0x00b8),
    ("cent", 0x00a2),
    ("circumflex", 0x02c6),
    ("colon", 0x003a),
    ("comma", 0x002c),
    ("copyright", 0x00a9),
    ("currency", 0x00a4),
    ("d", 0x0064),
    ("dagger", 0x2020),
    ("daggerdbl", 0x2021),
    ("degree", 0x00b0),
    ("dieresis", 0x00a8),
    ("divide", 0x00f7),
    ("dollar", 0x0024),
    ("dotaccent", 0x02d9),
    ("dotlessi", 0x0131),
    ("e", 0x0065),
    ("eacute", 0x00e9),
    ("ecircumflex", 0x00ea),
    ("edieresis", 0x00eb),
    ("egrave", 0x00e8),
    ("eight", 0x0038),
    ("ellipsis", 0x2026),
    ("emdash", 0x2014),
    ("endash", 0x2013),
    ("equal", 0x003d),
    ("eth", 0x00f0),
    ("exclam", 0x0021),
    ("exclamdown", 0x00a1),
    ("f", 0x0066),
    ("ff", 0xfb00),
    ("ffi", 0xfb03),
    ("ffl", 0xfb04),
    ("fi", 0xfb01),
    ("five", 0x0035),
    ("fl", 0xfb02),
    ("florin", 0x0192),
    ("four", 0x0034),
    ("fraction", 0x2044),
    ("g", 0x0067),
    ("germandbls", 0x00df),
    ("grave", 0x0060),
    ("greater", 0x003e),
    ("guillemotleft", 0x00ab),
    ("guillemotright", 0x00bb),
    ("guilsinglleft", 0x2039),
    ("guilsinglright", 0x203a),
    ("h", 0x0068),
    ("hungarumlaut", 0x02dd),
    ("hyphen", 0x002d),
    ("i", 0x0069),
    ("iacute", 0x00ed),
    ("icircumflex", 0x00ee),
    ("idieresis", 0x00ef),
    ("igrave", 0x00ec),
    ("j", 0x006a),
    ("k", 0x006b),
    ("l", 0x006c),
    ("less", 0x003c),
    ("logicalnot", 0x00ac),
    ("lslash", 0x0142),
    ("m", 0x006d),
    ("macron", 0x00af),
    ("minus", 0x2212),
    ("mu", 0x00b5),
    ("multiply", 0x00d7),
    ("n", 0x006e),
    ("nbspace", 0x00a0),
    ("nine", 0x0039),
    ("ntilde", 0x00f1),
    ("numbersign", 0x0023),
    ("o", 0x006f),
    ("oacute", 0x00f3),
    ("ocircumflex", 0x00f4),
    ("odieresis", 0x00f6),
    ("oe", 0x0153),
    ("ogonek", 0x02db),
    ("ograve", 0x00f2),
    ("one", 0x0031),
    ("onehalf", 0x00bd),
    ("onequarter", 0x00bc),
    ("onesuperior", 0x00b9),
    ("ordfeminine", 0x00aa),
    ("ordmasculine", 0x00ba),
    ("oslash", 0x00f8),
    ("otilde", 0x00f5),
    ("p", 0x0070),
    ("paragraph", 0x00b6),
    ("parenleft", 0x0028),
    ("parenright", 0x0029),
    ("percent", 0x0025),
    ("period", 0x002e),
    ("periodcentered", 0x00b7),
    ("perthousand", 0x2030),
    ("plus", 0x002b),
    ("plusminus", 0x00b1),
    ("q", 0x0071),
    ("question", 0x003f),
    ("questiondown", 0x00bf),
    ("quotedbl", 0x0022),
    ("quotedblbase", 0x201e),
    ("quotedblleft", 0x201c),
    ("quotedblright", 0x201d),
    ("quoteleft", 0x2018),
    ("quoteright", 0x2019),
    ("quotesinglbase", 0x201a),
    ("quotesingle", 0x0027),
    ("r", 0x0072),
    ("registered", 0x00ae),
    ("ring", 0x02da),
    ("s", 0x0073),
    ("scaron", 0x0161),
    ("section", 0x00a7),
    ("semicolon", 0x003b),
    ("seven", 0x0037),
    ("sfthyphen", 0x00ad),
    ("six", 0x0036),
    ("slash", 0x002f),
    ("space", 0x0020),
    ("sterling", 0x00a3),
    ("t", 0x0074),
    ("thorn", 0x00fe),
    ("three", 0x0033),
    ("threequarters", 0x00be),
    ("threesuperior", 0x00b3),
    ("tilde", 0x02dc),
    ("trademark", 0x2122),
    ("two", 0x0032),
    ("twosuperior", 0x00b2),
    ("u", 0x0075),
    ("uacute", 0x00fa),
    ("ucircumflex", 0x00fb),
    ("udieresis", 0x00fc),
    ("ugrave", 0x00f9),
    ("underscore", 0x005f),
    ("v", 0x0076),
    ("w", 0x0077),
    ("x", 0x0078),
    ("y", 0x0079),
    ("yacute", 0x00fd),
    ("ydieresis", 0x00ff),
    ("yen", 0x00a5),
    ("z", 0x007a),
    ("zcaron", 0x017e),
    ("zero", 0x0030),
];
